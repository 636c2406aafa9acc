//! Package metadata index.
//!
//! Everything the classifier needs to know about the package database:
//! which files the verifier reports as modified, which paths are owned by an
//! installed package (and by which one), which packages are installed, and
//! which were removed in past transactions.
//!
//! Queries go through a [`PackageSource`]. The production source shells out
//! to `rpm`/`dnf`; tests substitute a fixture. A failing query never aborts
//! the audit: it contributes nothing and leaves a [`Warning`] behind.

pub mod history;
pub mod rpm;

pub use history::{parse_history_info, parse_history_list};
pub use rpm::{
    parse_file_owners, parse_installed, parse_verify_output, InstalledPackage, RpmSource,
};

use drift_common::{Result, VerificationRecord, Warning};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, warn};

/// Read-only view of a package database.
pub trait PackageSource {
    /// Every file the verifier reports as differing from its packaged state.
    fn verify_all(&self) -> Result<Vec<VerificationRecord>>;

    /// Installed packages.
    fn installed(&self) -> Result<Vec<InstalledPackage>>;

    /// `(path, package name)` for every file owned by an installed package.
    fn file_owners(&self) -> Result<Vec<(String, String)>>;

    /// Names of packages removed in past transactions, in history order.
    fn removed_packages(&self) -> Result<Vec<String>>;
}

/// Snapshot of package metadata restricted to one configuration root.
#[derive(Debug, Clone, Default)]
pub struct PackageIndex {
    verification: BTreeMap<String, VerificationRecord>,
    owned: HashSet<String>,
    owners: HashMap<String, String>,
    installed: HashSet<String>,
    removed: Vec<String>,
    warnings: Vec<Warning>,
}

impl PackageIndex {
    /// Query `source` and keep only paths under `config_prefix`
    /// (host-absolute, e.g. `/etc`).
    pub fn build(source: &dyn PackageSource, config_prefix: &str) -> Self {
        let mut index = PackageIndex::default();

        match source.file_owners() {
            Ok(pairs) => {
                for (path, package) in pairs {
                    if is_under(&path, config_prefix) {
                        index.owned.insert(path.clone());
                        index.owners.entry(path).or_insert(package);
                    }
                }
            }
            Err(e) => index.degrade("rpm.owners", e),
        }

        match source.installed() {
            Ok(packages) => index.installed = packages.into_iter().map(|p| p.name).collect(),
            Err(e) => index.degrade("rpm.installed", e),
        }

        match source.verify_all() {
            Ok(records) => {
                for mut record in records {
                    if !is_under(&record.path, config_prefix) {
                        continue;
                    }
                    if record.package.is_none() {
                        record.package = index.owners.get(&record.path).cloned();
                    }
                    index.verification.insert(record.path.clone(), record);
                }
            }
            Err(e) => index.degrade("rpm.verify", e),
        }

        match source.removed_packages() {
            Ok(names) => {
                let mut seen = HashSet::new();
                index.removed = names
                    .into_iter()
                    .filter(|n| seen.insert(n.clone()))
                    .collect();
            }
            Err(e) => index.degrade("dnf.history", e),
        }

        info!(
            modified = index.verification.len(),
            owned = index.owned.len(),
            installed = index.installed.len(),
            removed = index.removed.len(),
            "package index built"
        );
        index
    }

    fn degrade(&mut self, source: &str, err: drift_common::Error) {
        warn!(source, error = %err, "package query failed; continuing without it");
        self.warnings.push(Warning::new(source, err.to_string()));
    }

    /// Verification records under the configuration root, in path order.
    pub fn verification(&self) -> &BTreeMap<String, VerificationRecord> {
        &self.verification
    }

    pub fn is_owned(&self, path: &str) -> bool {
        self.owned.contains(path)
    }

    pub fn owner_of(&self, path: &str) -> Option<&str> {
        self.owners.get(path).map(String::as_str)
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    /// Removed packages that are not installed again today.
    pub fn removed_not_installed(&self) -> impl Iterator<Item = &str> {
        self.removed
            .iter()
            .filter(|n| !self.is_installed(n))
            .map(String::as_str)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

/// Whether host-absolute `path` equals `prefix` or lies beneath it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_common::Error;

    struct Fixture {
        fail_verify: bool,
    }

    impl PackageSource for Fixture {
        fn verify_all(&self) -> Result<Vec<VerificationRecord>> {
            if self.fail_verify {
                return Err(Error::PackageQuery("rpm -Va timed out".into()));
            }
            Ok(vec![
                VerificationRecord::new("/etc/ssh/sshd_config", "S.5....T."),
                VerificationRecord::new("/usr/lib/systemd/system/foo.service", "S.5....T."),
            ])
        }

        fn installed(&self) -> Result<Vec<InstalledPackage>> {
            Ok(vec![InstalledPackage::parse("0:openssh-server-8.7p1-38.el9.x86_64").unwrap()])
        }

        fn file_owners(&self) -> Result<Vec<(String, String)>> {
            Ok(vec![
                ("/etc/ssh/sshd_config".into(), "openssh-server".into()),
                ("/etc/ssh/moduli".into(), "openssh".into()),
                ("/usr/bin/ssh".into(), "openssh-clients".into()),
            ])
        }

        fn removed_packages(&self) -> Result<Vec<String>> {
            Ok(vec!["old-daemon".into(), "openssh-server".into(), "old-daemon".into()])
        }
    }

    #[test]
    fn test_index_restricted_to_config_root() {
        let index = PackageIndex::build(&Fixture { fail_verify: false }, "/etc");
        assert_eq!(index.verification().len(), 1);
        assert!(index.is_owned("/etc/ssh/moduli"));
        assert!(!index.is_owned("/usr/bin/ssh"));
    }

    #[test]
    fn test_verification_package_completed_from_owners() {
        let index = PackageIndex::build(&Fixture { fail_verify: false }, "/etc");
        let record = &index.verification()["/etc/ssh/sshd_config"];
        assert_eq!(record.package.as_deref(), Some("openssh-server"));
    }

    #[test]
    fn test_removed_filters_reinstalled_and_duplicates() {
        let index = PackageIndex::build(&Fixture { fail_verify: false }, "/etc");
        let removed: Vec<_> = index.removed_not_installed().collect();
        assert_eq!(removed, vec!["old-daemon"]);
        assert!(index.is_installed("openssh-server"));
        assert!(!index.is_installed("openssh-server-8.7p1"));
    }

    #[test]
    fn test_failed_query_degrades_to_warning() {
        let index = PackageIndex::build(&Fixture { fail_verify: true }, "/etc");
        assert!(index.verification().is_empty());
        assert!(index.is_owned("/etc/ssh/moduli"));
        assert_eq!(index.warnings().len(), 1);
        assert_eq!(index.warnings()[0].source, "rpm.verify");
    }

    #[test]
    fn test_is_under() {
        assert!(is_under("/etc/hosts", "/etc"));
        assert!(is_under("/etc", "/etc/"));
        assert!(!is_under("/etcetera/x", "/etc"));
        assert!(is_under("/anything", "/"));
    }
}
