//! Secrets-review report, redaction counts and the output gate.

use crate::audit::record::RedactedConfig;
use crate::logging::{event_names, Stage};
use drift_common::{RedactionRecord, Result, SecretCategory};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File name the report is written under.
pub const SECRETS_REVIEW_FILE: &str = "secrets-review.md";

const INTRO: &str = "The following items were redacted or excluded. Handle them manually \
(e.g. Kubernetes secret, systemd credential, env at deploy).";

/// Markdown listing every redaction with its remediation.
pub fn render_secrets_review(redactions: &[RedactionRecord]) -> String {
    let mut out = String::new();
    out.push_str("# Secrets Review\n\n");
    out.push_str(INTRO);
    out.push_str("\n\n");

    if redactions.is_empty() {
        out.push_str("No redactions recorded.");
        return out;
    }

    out.push_str("| Path | Pattern | Line | Remediation |\n");
    out.push_str("|------|---------|------|-------------|\n");
    for r in redactions {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} |",
            escape_cell(&r.path),
            escape_cell(r.category.as_str()),
            escape_cell(r.location.as_str()),
            escape_cell(&r.remediation)
        );
    }
    out
}

/// Render and write the report for a redacted run into `output_dir`.
pub fn write_secrets_review(config: &RedactedConfig, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(SECRETS_REVIEW_FILE);
    std::fs::write(&path, render_secrets_review(config.redactions()))?;
    Ok(path)
}

/// Redaction count per category, for summary panels.
pub fn redaction_counts(redactions: &[RedactionRecord]) -> BTreeMap<SecretCategory, usize> {
    let mut counts = BTreeMap::new();
    for r in redactions {
        *counts.entry(r.category).or_insert(0) += 1;
    }
    counts
}

/// Run the residual-secret scan over a rendered output tree.
///
/// Call after every renderer has written into `output_dir`. Any hit fails
/// the run with [`drift_common::Error::SecretInOutput`].
pub fn gate_output(output_dir: &Path) -> Result<()> {
    match drift_redact::scan_directory(output_dir) {
        Ok(None) => {
            info!(
                target: event_names::GATE_CLEAN,
                stage = %Stage::Gate,
                root = %output_dir.display(),
                "output passed secret scan"
            );
            Ok(())
        }
        Ok(Some(path)) => {
            warn!(
                target: event_names::GATE_BLOCKED,
                stage = %Stage::Gate,
                root = %output_dir.display(),
                path = %path.display(),
                "secret pattern in rendered output"
            );
            Err(drift_redact::GateError::SecretDetected { path }.into())
        }
        Err(e) => {
            warn!(
                target: event_names::GATE_BLOCKED,
                stage = %Stage::Gate,
                root = %output_dir.display(),
                error = %e,
                "output scan failed"
            );
            Err(e.into())
        }
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
