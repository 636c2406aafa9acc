//! Configuration file classification.
//!
//! Every regular file under the configuration root becomes at most one
//! [`ConfigRecord`]:
//!
//! 1. Files the verifier reports as modified are `owned_modified`, in path
//!    order, whether or not the ownership set lists them.
//! 2. The root is then walked in sorted order. Files already emitted or owned
//!    by an installed package are skipped; files shipped by a removed package
//!    are `orphaned`; everything else is `unowned`.
//!
//! Records are keyed by host-absolute path (`/etc/...`) even when the host
//! is mounted elsewhere. I/O errors on single files or directories never
//! abort the pass.

pub mod noise;

pub use noise::is_generated_noise;

use crate::audit::record::{ClassifiedConfig, ConfigRecord};
use crate::diff::unified_diff_bytes;
use crate::package::{is_under, PackageIndex};
use crate::retrieve::PristineRetriever;
use drift_common::Warning;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Switches that change what the classifier emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Diff owned-modified files against their packaged originals.
    pub config_diffs: bool,
    /// Drop well-known system-generated files from the unowned set.
    pub skip_generated_noise: bool,
}

/// Classifies the files under one configuration root.
#[derive(Debug)]
pub struct Classifier<'a> {
    host_root: &'a Path,
    config_root: String,
    index: &'a PackageIndex,
    orphans: Option<&'a BTreeMap<String, String>>,
    retriever: Option<&'a PristineRetriever>,
    options: ClassifyOptions,
}

impl<'a> Classifier<'a> {
    /// `config_root` is host-absolute (`/etc`); `host_root` is where the
    /// host filesystem is mounted (`/` for the running system).
    pub fn new(host_root: &'a Path, config_root: &str, index: &'a PackageIndex) -> Self {
        Self {
            host_root,
            config_root: normalize_root(config_root),
            index,
            orphans: None,
            retriever: None,
            options: ClassifyOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClassifyOptions) -> Self {
        self.options = options;
        self
    }

    /// Path to removed-package map used to recognize orphaned files.
    pub fn with_orphans(mut self, orphans: &'a BTreeMap<String, String>) -> Self {
        self.orphans = Some(orphans);
        self
    }

    /// Source of pristine content for diffs.
    pub fn with_retriever(mut self, retriever: &'a PristineRetriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn config_root(&self) -> &str {
        &self.config_root
    }

    /// Run both passes.
    pub fn classify(&self) -> ClassifiedConfig {
        let mut records = Vec::new();
        let mut warnings = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (path, verification) in self.index.verification() {
            if !is_under(path, &self.config_root) {
                continue;
            }
            let full = host_path(self.host_root, path);
            if !is_file_on_disk(&full) {
                debug!(path = %path, "modified path is not a regular file on disk");
                continue;
            }
            let package = verification
                .package
                .clone()
                .or_else(|| self.index.owner_of(path).map(str::to_string));
            let mut record = ConfigRecord::owned_modified(
                path.as_str(),
                read_content(&full),
                verification.flags.as_str(),
                package,
            );
            if self.options.config_diffs {
                self.attach_diff(&mut record);
            }
            seen.insert(path.clone());
            records.push(record);
        }
        let owned_modified = records.len();

        let config_dir = host_path(self.host_root, &self.config_root);
        if !config_dir.is_dir() {
            warn!(root = %config_dir.display(), "configuration root missing");
            warnings.push(Warning::new(
                "classify.walk",
                format!("configuration root {} is not a directory", self.config_root),
            ));
            return ClassifiedConfig::new(records, warnings);
        }

        let mut skipped_noise = 0usize;
        for entry in WalkDir::new(&config_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    warnings.push(Warning::new("classify.walk", e.to_string()));
                    continue;
                }
            };
            if !is_regular_file(&entry) {
                continue;
            }
            let Some(path) = host_absolute(self.host_root, entry.path()) else {
                continue;
            };
            if seen.contains(&path) || self.index.is_owned(&path) {
                continue;
            }

            let orphan_of = self.orphans.and_then(|m| m.get(&path));
            let record = match orphan_of {
                Some(package) => {
                    ConfigRecord::orphaned(path.as_str(), read_content(entry.path()), package.clone())
                }
                None => {
                    if self.options.skip_generated_noise && is_generated_noise(&path) {
                        skipped_noise += 1;
                        continue;
                    }
                    ConfigRecord::unowned(path.as_str(), read_content(entry.path()))
                }
            };
            seen.insert(path);
            records.push(record);
        }

        info!(
            total = records.len(),
            owned_modified,
            skipped_noise,
            "classification complete"
        );
        ClassifiedConfig::new(records, warnings)
    }

    fn attach_diff(&self, record: &mut ConfigRecord) {
        let pristine = match (self.retriever, record.owning_package()) {
            (Some(retriever), Some(package)) => retriever.retrieve(package, record.path()),
            _ => None,
        };
        match pristine {
            Some(bytes) => {
                let diff = unified_diff_bytes(&bytes, record.content());
                record.set_diff(diff);
            }
            None => {
                debug!(path = record.path(), "pristine content unavailable");
                record.note_diff_unavailable();
            }
        }
    }
}

/// `/etc/` and `etc` both become `/etc`.
fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    format!("/{}", trimmed)
}

/// Where host-absolute `path` lives under `host_root`.
pub fn host_path(host_root: &Path, path: &str) -> PathBuf {
    host_root.join(path.trim_start_matches('/'))
}

/// Host-absolute key for a file found under `host_root`.
pub fn host_absolute(host_root: &Path, full: &Path) -> Option<String> {
    let rel = full.strip_prefix(host_root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", parts.join("/")))
}

/// Regular files, including symlinks that resolve to one.
fn is_regular_file(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink() && is_file_on_disk(entry.path())
}

/// Regular file, or symlink to one. Directories and missing paths are not.
fn is_file_on_disk(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// File text, decoded lossily; empty when unreadable.
fn read_content(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable file captured empty");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root("etc"), "/etc");
        assert_eq!(normalize_root("/etc/"), "/etc");
        assert_eq!(normalize_root("/srv/app"), "/srv/app");
    }

    #[test]
    fn test_host_path_and_back() {
        let host = Path::new("/host");
        let full = host_path(host, "/etc/ssh/sshd_config");
        assert_eq!(full, PathBuf::from("/host/etc/ssh/sshd_config"));
        assert_eq!(
            host_absolute(host, &full).as_deref(),
            Some("/etc/ssh/sshd_config")
        );
        assert_eq!(host_absolute(host, Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn test_host_absolute_on_root_mount() {
        assert_eq!(
            host_absolute(Path::new("/"), Path::new("/etc/hosts")).as_deref(),
            Some("/etc/hosts")
        );
    }
}
