//! Secret redaction for captured configuration files.
//!
//! This crate provides the single redaction path every captured file goes
//! through before it is stored or rendered, and the gate that re-checks the
//! rendered output.
//!
//! # Key Features
//!
//! - **Excluded paths**: shadow files, host keys, `*.key` and keytabs are never
//!   captured; a placeholder and an audit record take their place.
//! - **Ordered pattern table**: fourteen patterns (PEM blocks, key/token/password
//!   assignments, cloud credentials, connection-string passwords) applied in
//!   a fixed order.
//! - **Deterministic tokens**: `REDACTED_<CATEGORY>_<hex>` from a truncated
//!   SHA-256 of the secret value.
//! - **Fail-closed**: a pattern that does not compile aborts the engine instead
//!   of silently narrowing coverage.
//! - **Verification gate**: a stricter rescan of the output tree with no
//!   exemptions.
//!
//! # Example
//!
//! ```no_run
//! use drift_redact::RedactionEngine;
//!
//! let engine = RedactionEngine::new().unwrap();
//! let result = engine.redact_file("/etc/myapp.conf", "password=hunter2\n", None);
//! assert!(!result.content.contains("hunter2"));
//! ```

pub mod engine;
pub mod error;
pub mod exclude;
pub mod gate;
pub mod hash;
pub mod patterns;

pub use engine::{RedactedFile, RedactionEngine, TextRedaction};
pub use error::{GateError, RedactionError, Result};
pub use exclude::{is_excluded_path, EXCLUDED_PLACEHOLDER};
pub use gate::{ensure_clean, scan_directory, scan_with_table};
pub use hash::{
    is_redaction_token, redaction_token, token_digest, PRIVATE_KEY_TOKEN, TOKEN_HASH_HEX_LEN,
};
pub use patterns::{is_false_positive, PatternTable, SecretPattern, BUILTIN_PATTERNS};
