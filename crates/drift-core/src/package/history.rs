//! Removed-package discovery from `dnf history`.

use crate::collect::tool_runner::{ToolError, ToolRunner};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Package name is the shortest prefix followed by `-<digit>`.
static NEVRA_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.+?)-\d").unwrap());

const REMOVE_ACTIONS: [&str; 3] = ["Removed", "Erase", "Erased"];

/// Transaction IDs from `dnf history list` whose action column records a
/// removal.
pub fn parse_history_list(stdout: &str) -> Vec<u64> {
    stdout
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split('|').collect();
            if columns.len() < 4 {
                return None;
            }
            let action = columns[3];
            if !REMOVE_ACTIONS.iter().any(|a| action.contains(a)) {
                return None;
            }
            columns[0].trim().parse().ok()
        })
        .collect()
}

/// Names of packages listed as removed in `dnf history info` output.
pub fn parse_history_info(stdout: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in stdout.lines() {
        let mut tokens = line.split_whitespace();
        if !tokens.any(|t| REMOVE_ACTIONS.contains(&t)) {
            continue;
        }
        let Some(nevra) = tokens.next() else {
            continue;
        };
        if let Some(caps) = NEVRA_NAME.captures(nevra) {
            names.push(caps[1].to_string());
        }
    }
    names
}

fn dnf(runner: &ToolRunner, host_root: &Path, args: &[&str]) -> Result<String, ToolError> {
    let root = host_root.display().to_string();
    let mut argv: Vec<&str> = Vec::with_capacity(args.len() + 2);
    if host_root != Path::new("/") {
        argv.push("--installroot");
        argv.push(&root);
    }
    argv.extend_from_slice(args);
    let output = runner.run("dnf", &argv)?;
    Ok(output.require_success()?.stdout_str())
}

/// Query `dnf history` for every package removed on the host.
pub(crate) fn removed_via_dnf(runner: &ToolRunner, host_root: &Path) -> Result<Vec<String>, ToolError> {
    let list = dnf(runner, host_root, &["history", "list", "-q"])?;
    let mut removed = Vec::new();
    for tid in parse_history_list(&list) {
        let tid_arg = tid.to_string();
        match dnf(runner, host_root, &["history", "info", &tid_arg, "-q"]) {
            Ok(info) => removed.extend(parse_history_info(&info)),
            Err(e) => debug!(transaction = tid, error = %e, "skipping unreadable transaction"),
        }
    }
    Ok(removed)
}
