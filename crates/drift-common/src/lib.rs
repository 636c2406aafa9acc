//! confdrift common types and errors.
//!
//! This crate provides the plain records shared by the classification,
//! redaction and reporting layers:
//! - Package verification records as reported by the package verifier
//! - Secret categories and the redaction audit log entry
//! - Non-fatal run warnings
//! - The shared error type

pub mod error;
pub mod model;

pub use error::{Error, ErrorCategory, Result};
pub use model::{
    ConfigKind, RedactionLocation, RedactionRecord, SecretCategory, VerificationRecord, Warning,
};
