//! confdrift core library
//!
//! This library audits a host's configuration root against its package
//! database:
//! - Package metadata queries (`rpm`, `dnf`) through a timed tool runner
//! - Pristine content retrieval from cached package archives
//! - Classification into owned-modified, unowned and orphaned files
//! - Unified diffs against packaged originals
//! - The classify-then-redact pipeline and its snapshot document
//! - Secrets-review reporting, configuration and structured logging
//!
//! Redaction itself lives in `drift-redact`.

pub mod archive;
pub mod audit;
pub mod classify;
pub mod collect;
pub mod config;
pub mod diff;
pub mod logging;
pub mod package;
pub mod report;
pub mod retrieve;
pub mod snapshot;

pub use audit::{redact, AuditOutcome, AuditRun, ClassifiedConfig, ConfigRecord, RedactedConfig};
pub use classify::{Classifier, ClassifyOptions};
pub use config::{load_config, AuditConfig, ConfigError, ConfigOptions, ResolvedConfig};
pub use package::{PackageIndex, PackageSource};
pub use retrieve::PristineRetriever;
pub use snapshot::{snapshot_schema, Snapshot, SnapshotMeta, SNAPSHOT_SCHEMA_VERSION};
