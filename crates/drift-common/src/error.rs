//! Error types for confdrift.
//!
//! Errors carry a stable numeric code and a category so callers can group
//! them without string matching:
//! - 10-19: Configuration errors
//! - 20-29: Package metadata errors
//! - 30-39: Redaction errors
//! - 40-49: Verification gate errors
//! - 50-59: Snapshot errors
//! - 60-69: I/O errors
//!
//! Per-file I/O failures during classification never surface here: they are
//! absorbed by the classifier. What reaches this type is fatal to the
//! operation that returned it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for confdrift operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Package manager queries and package archives.
    Package,
    /// Secret redaction pass.
    Redaction,
    /// Residual-secret scan of rendered output.
    Gate,
    /// Snapshot document persistence.
    Snapshot,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Package => write!(f, "package"),
            ErrorCategory::Redaction => write!(f, "redaction"),
            ErrorCategory::Gate => write!(f, "gate"),
            ErrorCategory::Snapshot => write!(f, "snapshot"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for confdrift.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    ConfigValidation(String),

    // Package metadata errors (20-29)
    #[error("package query failed: {0}")]
    PackageQuery(String),

    #[error("malformed package archive: {0}")]
    ArchiveFormat(String),

    // Redaction errors (30-39)
    #[error("redaction engine failure: {0}")]
    Redaction(String),

    // Gate errors (40-49)
    #[error("secret pattern found in output at {path}")]
    SecretInOutput { path: String },

    // Snapshot errors (50-59)
    #[error("snapshot schema mismatch: expected {expected}, got {actual}")]
    SnapshotSchema { expected: String, actual: String },

    #[error("snapshot corrupted: {0}")]
    SnapshotCorrupted(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::ConfigValidation(_) => 11,
            Error::PackageQuery(_) => 20,
            Error::ArchiveFormat(_) => 21,
            Error::Redaction(_) => 30,
            Error::SecretInOutput { .. } => 40,
            Error::SnapshotSchema { .. } => 50,
            Error::SnapshotCorrupted(_) => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::ConfigValidation(_) => ErrorCategory::Config,
            Error::PackageQuery(_) | Error::ArchiveFormat(_) => ErrorCategory::Package,
            Error::Redaction(_) => ErrorCategory::Redaction,
            Error::SecretInOutput { .. } => ErrorCategory::Gate,
            Error::SnapshotSchema { .. } | Error::SnapshotCorrupted(_) => ErrorCategory::Snapshot,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Whether retrying or degrading can get past this error.
    ///
    /// A gate positive and a redaction failure are never recoverable: both
    /// mean captured content may contain a live secret.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::ConfigValidation(_) => true,
            Error::PackageQuery(_) | Error::ArchiveFormat(_) => true,
            Error::Redaction(_) => false,
            Error::SecretInOutput { .. } => false,
            Error::SnapshotSchema { .. } => false,
            Error::SnapshotCorrupted(_) => false,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::ConfigValidation(_) => {
                "Check the config file syntax and that host_root/config_root point at a real tree."
            }
            Error::PackageQuery(_) => {
                "Ensure rpm and dnf are installed and the host root is readable. Results degrade to unowned."
            }
            Error::ArchiveFormat(_) => {
                "The cached package is damaged. Clear the package cache entry and re-download it."
            }
            Error::Redaction(_) => {
                "The redaction pattern table failed to load. Do not publish any output from this run."
            }
            Error::SecretInOutput { .. } => {
                "Remove or redact the reported file by hand, then re-run the verification before pushing."
            }
            Error::SnapshotSchema { .. } => {
                "The snapshot was written by an incompatible version. Re-run the inspection."
            }
            Error::SnapshotCorrupted(_) => "Re-run the inspection to regenerate the snapshot.",
            Error::Io(_) => "Check disk space and permissions, then retry.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq .' or regenerate the file.",
        }
    }
}
