//! Main redaction engine.
//!
//! The RedactionEngine applies the excluded-path table and the ordered
//! pattern table to captured file text, producing new text plus one audit
//! record per replacement. Input is never mutated.

use crate::exclude::{is_excluded_path, EXCLUDED_PLACEHOLDER};
use crate::hash::{is_redaction_token, redaction_token};
use crate::patterns::{is_comment_at, is_false_positive, PatternTable, SecretPattern};
use crate::Result;
use drift_common::{RedactionLocation, RedactionRecord, SecretCategory};
use tracing::{debug, info};

/// Result of redacting one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRedaction {
    /// The redacted output string.
    pub text: String,
    /// One entry per replacement, in application order.
    pub categories: Vec<SecretCategory>,
}

impl TextRedaction {
    /// Whether any replacement was made.
    pub fn was_modified(&self) -> bool {
        !self.categories.is_empty()
    }
}

/// Result of redacting one captured file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedFile {
    pub content: String,
    pub diff: Option<String>,
    pub records: Vec<RedactionRecord>,
    /// Whether the path was withheld entirely.
    pub excluded: bool,
}

/// The main redaction engine.
#[derive(Debug, Clone)]
pub struct RedactionEngine {
    table: PatternTable,
}

impl RedactionEngine {
    /// Create an engine over the built-in pattern table.
    ///
    /// Fails if the table cannot be compiled; there is no degraded mode.
    pub fn new() -> Result<Self> {
        Ok(Self::with_table(PatternTable::builtin()?))
    }

    /// Create an engine over an explicit table.
    pub fn with_table(table: PatternTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Apply every pattern, in table order, to `text`.
    pub fn redact_text(&self, text: &str) -> TextRedaction {
        let mut current = text.to_string();
        let mut categories = Vec::new();

        for pattern in self.table.patterns() {
            if let Some(rewritten) = apply_pattern(pattern, &current, &mut categories) {
                current = rewritten;
            }
        }

        TextRedaction {
            text: current,
            categories,
        }
    }

    /// Redact a captured file: excluded paths are replaced wholesale,
    /// everything else has its content and diff scanned.
    pub fn redact_file(&self, path: &str, content: &str, diff: Option<&str>) -> RedactedFile {
        if is_excluded_path(path) {
            info!(path, "excluding sensitive path from capture");
            return RedactedFile {
                content: EXCLUDED_PLACEHOLDER.to_string(),
                diff: None,
                records: vec![RedactionRecord::new(
                    path,
                    SecretCategory::ExcludedPath,
                    RedactionLocation::EntireFile,
                )],
                excluded: true,
            };
        }

        let mut records = Vec::new();

        let content = self.redact_text(content);
        records.extend(
            content
                .categories
                .iter()
                .map(|c| RedactionRecord::new(path, *c, RedactionLocation::Content)),
        );

        let diff = diff.map(|d| {
            let redacted = self.redact_text(d);
            records.extend(
                redacted
                    .categories
                    .iter()
                    .map(|c| RedactionRecord::new(path, *c, RedactionLocation::Diff)),
            );
            redacted.text
        });

        if !records.is_empty() {
            debug!(path, redactions = records.len(), "redacted secrets");
        }

        RedactedFile {
            content: content.text,
            diff,
            records,
            excluded: false,
        }
    }
}

/// Rebuild `text` with every eligible match of `pattern` replaced by its
/// token. Returns `None` when nothing was replaced.
fn apply_pattern(
    pattern: &SecretPattern,
    text: &str,
    categories: &mut Vec<SecretCategory>,
) -> Option<String> {
    let regex = pattern.regex();
    if !regex.is_match(text) {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut replaced = false;

    for caps in regex.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        if is_comment_at(text, whole.start()) {
            continue;
        }
        let value = pattern.secret_value(&caps);
        if is_redaction_token(value) {
            continue;
        }
        if pattern.suppresses_false_positives() && is_false_positive(value) {
            continue;
        }

        out.push_str(&text[last..whole.start()]);
        out.push_str(&redaction_token(pattern.category(), value));
        last = whole.end();
        replaced = true;
        categories.push(pattern.category());
    }

    if !replaced {
        return None;
    }
    out.push_str(&text[last..]);
    Some(out)
}
