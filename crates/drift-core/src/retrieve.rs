//! Pristine content retrieval from the local package cache.
//!
//! A package's archive is located by exact name prefix in the cache
//! directories; one member is then read from it in memory. Every failure
//! here is non-fatal and reads as "not found".

use crate::archive::ArchiveExtractor;
use crate::package::{is_under, PackageIndex};
use drift_common::Warning;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Whether `file_name` is an archive of package `name`: `<name>-` followed
/// by an ASCII digit, ending in `.rpm`. `foo` never matches `foo-bar-1.0.rpm`.
pub fn archive_matches(file_name: &str, name: &str) -> bool {
    if name.is_empty() || !file_name.ends_with(".rpm") {
        return false;
    }
    file_name
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// Locates cached package archives and reads members out of them.
pub struct PristineRetriever {
    cache_dirs: Vec<PathBuf>,
    extractor: Box<dyn ArchiveExtractor>,
}

impl std::fmt::Debug for PristineRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PristineRetriever")
            .field("cache_dirs", &self.cache_dirs)
            .finish_non_exhaustive()
    }
}

impl PristineRetriever {
    pub fn new(cache_dirs: Vec<PathBuf>, extractor: Box<dyn ArchiveExtractor>) -> Self {
        Self {
            cache_dirs,
            extractor,
        }
    }

    pub fn cache_dirs(&self) -> &[PathBuf] {
        &self.cache_dirs
    }

    /// First matching archive for `name` across all cache directories, in
    /// sorted path order.
    pub fn find_archive(&self, name: &str) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        for dir in &self.cache_dirs {
            if !dir.is_dir() {
                continue;
            }
            let entries = WalkDir::new(dir)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!(error = %e, "skipping unreadable cache entry");
                        None
                    }
                });
            for entry in entries {
                if !entry.file_type().is_file() {
                    continue;
                }
                let matches = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|file_name| archive_matches(file_name, name));
                if matches {
                    candidates.push(entry.into_path());
                }
            }
        }
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Original bytes of `path` as shipped in `package`, or `None`.
    pub fn retrieve(&self, package: &str, path: &str) -> Option<Vec<u8>> {
        let Some(archive) = self.find_archive(package) else {
            debug!(package, "no cached archive");
            return None;
        };
        match self.extractor.extract(&archive, path) {
            Ok(Some(bytes)) => Some(bytes),
            Ok(None) => {
                debug!(package, path, archive = %archive.display(), "member not in archive");
                None
            }
            Err(e) => {
                warn!(package, path, error = %e, "archive extraction failed");
                None
            }
        }
    }

    /// Map of path to removed package for every file a removed, not
    /// reinstalled, package shipped under `config_prefix`.
    ///
    /// Packages without a cached archive contribute nothing and leave a
    /// warning; their files stay unowned. The first removed package to
    /// claim a path keeps it.
    pub fn orphan_manifest(
        &self,
        index: &PackageIndex,
        config_prefix: &str,
    ) -> (BTreeMap<String, String>, Vec<Warning>) {
        let mut manifest = BTreeMap::new();
        let mut warnings = Vec::new();

        for package in index.removed_not_installed() {
            let Some(archive) = self.find_archive(package) else {
                warnings.push(Warning::new(
                    "orphan.manifest",
                    format!(
                        "no cached archive for removed package {}; its files are reported as unowned",
                        package
                    ),
                ));
                continue;
            };
            match self.extractor.list(&archive) {
                Ok(members) => {
                    for member in members {
                        let path = format!("/{}", member);
                        if is_under(&path, config_prefix) {
                            manifest.entry(path).or_insert_with(|| package.to_string());
                        }
                    }
                }
                Err(e) => warnings.push(Warning::new(
                    "orphan.manifest",
                    format!("could not list archive for removed package {}: {}", package, e),
                )),
            }
        }

        if !warnings.is_empty() {
            warn!(
                unavailable = warnings.len(),
                "orphan manifests incomplete; affected files fall back to unowned"
            );
        }
        info!(paths = manifest.len(), "orphan manifest built");
        (manifest, warnings)
    }
}

/// Default cache directories below a host root.
pub fn default_cache_dirs(host_root: &Path) -> Vec<PathBuf> {
    vec![
        host_root.join("var/cache/dnf"),
        host_root.join("var/cache/yum"),
    ]
}
