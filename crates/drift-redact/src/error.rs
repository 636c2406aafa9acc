//! Error types for the redaction engine and the verification gate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for redaction operations.
pub type Result<T> = std::result::Result<T, RedactionError>;

/// Errors that can occur during redaction.
#[derive(Error, Debug)]
pub enum RedactionError {
    /// A detection pattern failed to compile. Fatal: redaction must not run
    /// with a partial table.
    #[error("pattern error: {0}")]
    PatternError(String),

    /// I/O error while reading input.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<RedactionError> for drift_common::Error {
    fn from(err: RedactionError) -> Self {
        match err {
            RedactionError::PatternError(msg) => drift_common::Error::Redaction(msg),
            RedactionError::IoError(e) => drift_common::Error::Io(e),
        }
    }
}

/// Errors returned by the output verification gate.
#[derive(Error, Debug)]
pub enum GateError {
    /// A file in the output tree still matches a secret pattern.
    #[error("secret pattern detected in {}", path.display())]
    SecretDetected {
        /// Path relative to the scanned root.
        path: PathBuf,
    },

    /// The output root itself could not be walked.
    #[error("cannot scan {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The pattern table could not be loaded.
    #[error(transparent)]
    Redaction(#[from] RedactionError),
}

impl From<GateError> for drift_common::Error {
    fn from(err: GateError) -> Self {
        match err {
            GateError::SecretDetected { path } => drift_common::Error::SecretInOutput {
                path: path.display().to_string(),
            },
            GateError::Walk { root, source } => drift_common::Error::Io(std::io::Error::other(format!(
                "{}: {}",
                root.display(),
                source
            ))),
            GateError::Redaction(e) => e.into(),
        }
    }
}
