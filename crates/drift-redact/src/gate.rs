//! Output verification gate.
//!
//! Last check before rendered output leaves the machine: every file under
//! the output root is scanned against the same pattern table the redactor
//! uses, but with no exclusions. Comment lines and false-positive keywords
//! are not exempt here, so the gate is strictly stricter than the redactor.

use crate::error::GateError;
use crate::patterns::PatternTable;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Scan `root` and return the first file (relative to `root`, in sorted walk
/// order) that matches any secret pattern.
pub fn scan_directory(root: &Path) -> Result<Option<PathBuf>, GateError> {
    let table = PatternTable::builtin()?;
    scan_with_table(&table, root)
}

/// Like [`scan_directory`] with an explicit table.
pub fn scan_with_table(table: &PatternTable, root: &Path) -> Result<Option<PathBuf>, GateError> {
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    let mut scanned = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(GateError::Walk {
                    root: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry during secret scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let bytes = match std::fs::read(entry.path()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "skipping unreadable file during secret scan");
                continue;
            }
        };
        scanned += 1;

        let text = String::from_utf8_lossy(&bytes);
        if let Some(category) = table.first_match(&text) {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            warn!(path = %relative.display(), category = %category, "secret pattern found in output");
            return Ok(Some(relative));
        }
    }

    debug!(root = %root.display(), files = scanned, "output tree clean");
    Ok(None)
}

/// Fail with [`GateError::SecretDetected`] if `root` contains a secret.
pub fn ensure_clean(root: &Path) -> Result<(), GateError> {
    match scan_directory(root)? {
        Some(path) => Err(GateError::SecretDetected { path }),
        None => Ok(()),
    }
}
