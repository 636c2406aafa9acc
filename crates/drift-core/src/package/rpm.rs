//! rpm-backed package source and its output parsers.

use super::{history, PackageSource};
use crate::collect::tool_runner::{ToolError, ToolRunner};
use drift_common::{Result, VerificationRecord};
use std::path::{Path, PathBuf};
use tracing::debug;

/// `rpm -qa` query format, one package per line.
pub const INSTALLED_QUERYFORMAT: &str = "%{EPOCH}:%{NAME}-%{VERSION}-%{RELEASE}.%{ARCH}\\n";

/// `rpm -qa` query format, one owned file per line with its package.
pub const FILE_OWNERS_QUERYFORMAT: &str = "[%{FILENAMES}\\t%{NAME}\\n]";

/// File attribute markers that may sit between the flags and the path.
const VERIFY_ATTR_MARKERS: [char; 5] = ['c', 'd', 'g', 'l', 'r'];

/// An installed package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub epoch: String,
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl InstalledPackage {
    /// Parse `EPOCH:NAME-VERSION-RELEASE.ARCH`. The name may itself contain
    /// hyphens (`audit-libs`). An `(none)` epoch becomes `0`.
    pub fn parse(line: &str) -> Option<Self> {
        let (epoch, rest) = line.trim().split_once(':')?;
        let epoch = match epoch {
            "(none)" => "0",
            e if !e.is_empty() && e.chars().all(|c| c.is_ascii_digit()) => e,
            _ => return None,
        };
        let (base, arch) = rest.rsplit_once('.')?;
        let (base, release) = base.rsplit_once('-')?;
        let (name, version) = base.rsplit_once('-')?;
        if name.is_empty() || version.is_empty() || release.is_empty() || arch.is_empty() {
            return None;
        }
        Some(Self {
            epoch: epoch.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// Parse `rpm -Va` output.
///
/// Each line is a 9-character flag field (`S.5....T.`, or `missing`), an
/// optional one-letter attribute marker, then the path.
pub fn parse_verify_output(stdout: &str) -> Vec<VerificationRecord> {
    stdout
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.len() < 11 {
                return None;
            }
            let flags = line.get(..9)?.trim();
            let rest = line.get(9..)?.trim_start();
            let path = match rest.split_once(' ') {
                Some((marker, path))
                    if marker.len() == 1
                        && marker.chars().all(|c| VERIFY_ATTR_MARKERS.contains(&c)) =>
                {
                    path.trim()
                }
                _ => rest.trim(),
            };
            if path.is_empty() || flags.is_empty() {
                return None;
            }
            Some(VerificationRecord::new(path, flags))
        })
        .collect()
}

/// Parse `rpm -qa --queryformat` output with [`INSTALLED_QUERYFORMAT`].
/// Malformed lines are skipped.
pub fn parse_installed(stdout: &str) -> Vec<InstalledPackage> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(InstalledPackage::parse)
        .collect()
}

/// Parse `rpm -qa --queryformat` output with [`FILE_OWNERS_QUERYFORMAT`].
pub fn parse_file_owners(stdout: &str) -> Vec<(String, String)> {
    stdout
        .lines()
        .filter_map(|line| {
            let (path, name) = line.split_once('\t')?;
            let (path, name) = (path.trim(), name.trim());
            if path.starts_with('/') && !name.is_empty() {
                Some((path.to_string(), name.to_string()))
            } else {
                None
            }
        })
        .collect()
}

/// Package source that queries the host's rpm database.
#[derive(Debug, Clone)]
pub struct RpmSource {
    runner: ToolRunner,
    host_root: PathBuf,
}

impl RpmSource {
    pub fn new(runner: ToolRunner, host_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            host_root: host_root.into(),
        }
    }

    pub fn host_root(&self) -> &Path {
        &self.host_root
    }

    fn rpm(&self, args: &[&str]) -> std::result::Result<String, ToolError> {
        let mut full: Vec<String> = Vec::with_capacity(args.len() + 2);
        if self.host_root != Path::new("/") {
            full.push("--root".to_string());
            full.push(self.host_root.display().to_string());
        }
        full.extend(args.iter().map(|a| a.to_string()));
        let argv: Vec<&str> = full.iter().map(String::as_str).collect();

        let output = self.runner.run("rpm", &argv)?;
        Ok(output.require_complete()?.stdout_str())
    }
}

impl PackageSource for RpmSource {
    fn verify_all(&self) -> Result<Vec<VerificationRecord>> {
        // Non-zero exit just means something differs.
        let stdout = self.rpm(&["-Va", "--nodeps", "--noscripts"])?;
        let records = parse_verify_output(&stdout);
        debug!(count = records.len(), "parsed rpm -Va");
        Ok(records)
    }

    fn installed(&self) -> Result<Vec<InstalledPackage>> {
        let stdout = self.rpm(&["-qa", "--queryformat", INSTALLED_QUERYFORMAT])?;
        Ok(parse_installed(&stdout))
    }

    fn file_owners(&self) -> Result<Vec<(String, String)>> {
        let stdout = self.rpm(&["-qa", "--queryformat", FILE_OWNERS_QUERYFORMAT])?;
        Ok(parse_file_owners(&stdout))
    }

    fn removed_packages(&self) -> Result<Vec<String>> {
        Ok(history::removed_via_dnf(&self.runner, &self.host_root)?)
    }
}
