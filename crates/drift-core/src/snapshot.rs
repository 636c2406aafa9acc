//! The persisted snapshot document.
//!
//! A snapshot can only be built from a [`RedactedConfig`], so nothing
//! written here has skipped the redaction pass. Loading checks the schema
//! version before handing the document back.

use crate::audit::record::{ConfigRecord, RedactedConfig};
use crate::logging::{event_names, Stage};
use chrono::{DateTime, Utc};
use drift_common::{Error, RedactionRecord, Result, Warning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Schema version written to and required from snapshot files.
pub const SNAPSHOT_SCHEMA_VERSION: &str = "1.0.0";

/// Run provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SnapshotMeta {
    pub run_id: String,
    pub host_root: String,
    /// Host-absolute configuration root.
    pub config_root: String,
    pub generated_at: DateTime<Utc>,
    pub config_diffs: bool,
    /// SHA-256 of the config file the run used, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
struct ConfigSection {
    files: Vec<ConfigRecord>,
}

/// Complete snapshot document.
///
/// Fields are read-only: a snapshot is built from a [`RedactedConfig`] or
/// read back from a file this crate wrote, so its records never hold
/// unredacted content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Snapshot {
    schema_version: String,
    meta: SnapshotMeta,
    config: ConfigSection,
    redactions: Vec<RedactionRecord>,
    #[serde(default)]
    warnings: Vec<Warning>,
}

impl Snapshot {
    pub fn new(redacted: RedactedConfig, meta: SnapshotMeta) -> Self {
        let (files, redactions, warnings) = redacted.into_parts();
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION.to_string(),
            meta,
            config: ConfigSection { files },
            redactions,
            warnings,
        }
    }

    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    pub fn meta(&self) -> &SnapshotMeta {
        &self.meta
    }

    pub fn files(&self) -> &[ConfigRecord] {
        &self.config.files
    }

    pub fn redactions(&self) -> &[RedactionRecord] {
        &self.redactions
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)?;
        info!(
            target: event_names::SNAPSHOT_WRITTEN,
            stage = %Stage::Snapshot,
            path = %path.display(),
            files = self.config.files.len(),
            redactions = self.redactions.len(),
            "snapshot written"
        );
        Ok(())
    }

    /// Read a snapshot, rejecting other schema versions.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a snapshot document. Records are taken as stored; the input is
    /// expected to be the output of [`Snapshot::save`], not arbitrary JSON.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(content)?;
        let version = raw
            .get("schema_version")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::SnapshotCorrupted("missing schema_version".into()))?;
        if version != SNAPSHOT_SCHEMA_VERSION {
            return Err(Error::SnapshotSchema {
                expected: SNAPSHOT_SCHEMA_VERSION.to_string(),
                actual: version.to_string(),
            });
        }
        serde_json::from_value(raw).map_err(|e| Error::SnapshotCorrupted(e.to_string()))
    }
}

/// JSON Schema for [`Snapshot`].
pub fn snapshot_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(Snapshot)).unwrap_or(serde_json::Value::Null)
}
