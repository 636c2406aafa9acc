//! Classified configuration records and the typestate wrappers that keep
//! classification ahead of redaction.

use drift_common::{ConfigKind, RedactionRecord, Warning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Appended to captured content when a diff was requested but the pristine
/// file could not be retrieved.
pub const DIFF_UNAVAILABLE_NOTE: &str =
    "\n# NOTE: could not retrieve package default for diff; full file included\n";

/// One file under the configuration root.
///
/// Only the classifier creates records and only the redaction step rewrites
/// their content, so `kind` is fixed from creation. `Deserialize` is only
/// for reading back a saved [`crate::Snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigRecord {
    path: String,
    kind: ConfigKind,
    content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    verification_flags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owning_package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
}

impl ConfigRecord {
    pub(crate) fn owned_modified(
        path: impl Into<String>,
        content: String,
        flags: impl Into<String>,
        package: Option<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind: ConfigKind::OwnedModified,
            content,
            verification_flags: Some(flags.into()),
            owning_package: package,
            diff: None,
        }
    }

    pub(crate) fn unowned(path: impl Into<String>, content: String) -> Self {
        Self {
            path: path.into(),
            kind: ConfigKind::Unowned,
            content,
            verification_flags: None,
            owning_package: None,
            diff: None,
        }
    }

    pub(crate) fn orphaned(path: impl Into<String>, content: String, package: String) -> Self {
        Self {
            path: path.into(),
            kind: ConfigKind::Orphaned,
            content,
            verification_flags: None,
            owning_package: Some(package),
            diff: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn verification_flags(&self) -> Option<&str> {
        self.verification_flags.as_deref()
    }

    pub fn owning_package(&self) -> Option<&str> {
        self.owning_package.as_deref()
    }

    pub fn diff(&self) -> Option<&str> {
        self.diff.as_deref()
    }

    /// Attach a diff. Ignored for anything but owned-modified records.
    pub(crate) fn set_diff(&mut self, diff: String) {
        if self.kind == ConfigKind::OwnedModified {
            self.diff = Some(diff);
        }
    }

    pub(crate) fn note_diff_unavailable(&mut self) {
        self.content.push_str(DIFF_UNAVAILABLE_NOTE);
    }

    pub(crate) fn with_redacted(mut self, content: String, diff: Option<String>) -> Self {
        self.content = content;
        self.diff = diff;
        self
    }
}

/// Records straight out of the classifier. Not serializable: the only way
/// forward is [`redact`](super::redact).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedConfig {
    records: Vec<ConfigRecord>,
    warnings: Vec<Warning>,
}

impl ClassifiedConfig {
    pub(crate) fn new(records: Vec<ConfigRecord>, warnings: Vec<Warning>) -> Self {
        Self { records, warnings }
    }

    pub fn records(&self) -> &[ConfigRecord] {
        &self.records
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Put warnings from earlier stages ahead of the classifier's own.
    pub(crate) fn prepend_warnings(&mut self, earlier: Vec<Warning>) {
        self.warnings.splice(0..0, earlier);
    }

    pub(crate) fn into_parts(self) -> (Vec<ConfigRecord>, Vec<Warning>) {
        (self.records, self.warnings)
    }
}

/// Records after the redaction pass, with the full redaction log. The
/// snapshot writer and the renderers accept only this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedConfig {
    records: Vec<ConfigRecord>,
    redactions: Vec<RedactionRecord>,
    warnings: Vec<Warning>,
}

impl RedactedConfig {
    pub(crate) fn new(
        records: Vec<ConfigRecord>,
        redactions: Vec<RedactionRecord>,
        warnings: Vec<Warning>,
    ) -> Self {
        Self {
            records,
            redactions,
            warnings,
        }
    }

    pub fn records(&self) -> &[ConfigRecord] {
        &self.records
    }

    pub fn redactions(&self) -> &[RedactionRecord] {
        &self.redactions
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn record(&self, path: &str) -> Option<&ConfigRecord> {
        self.records.iter().find(|r| r.path == path)
    }

    pub(crate) fn into_parts(self) -> (Vec<ConfigRecord>, Vec<RedactionRecord>, Vec<Warning>) {
        (self.records, self.redactions, self.warnings)
    }
}
