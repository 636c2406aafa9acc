//! Ordered secret pattern table.
//!
//! Patterns are applied in table order. Each pattern rewrites the whole text
//! before the next one sees it, so when two categories overlap the earlier,
//! more specific entry wins the region and later entries only see its token.
//!
//! Patterns that isolate the secret put it in a `value` capture group; the
//! token digest is computed over that group, and over the whole match when
//! the pattern has none.

use crate::error::{RedactionError, Result};
use crate::hash::is_redaction_token;
use drift_common::SecretCategory;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

/// Pattern sources in application order.
pub const BUILTIN_PATTERNS: &[(SecretCategory, &str)] = &[
    (
        SecretCategory::PrivateKey,
        r"-----BEGIN [A-Z0-9 ]*PRIVATE KEY-----[\s\S]+?-----END [A-Z0-9 ]*PRIVATE KEY-----",
    ),
    (
        SecretCategory::ApiKey,
        r#"(?i)(api[_-]?key|apikey)\s*[:=]\s*['"]?(?P<value>[a-zA-Z0-9_\-]{20,})['"]?"#,
    ),
    (
        SecretCategory::Token,
        r#"(?i)(token)\s*[:=]\s*['"]?(?P<value>[a-zA-Z0-9_\-]{20,})['"]?"#,
    ),
    (
        SecretCategory::Password,
        r#"(?i)(password|passwd|pass)\s*[:=]\s*['"]?(?P<value>[^\s'"]+)['"]?"#,
    ),
    (
        SecretCategory::Secret,
        r#"(?i)secret\s*[:=]\s*['"]?(?P<value>[^\s'"]+)['"]?"#,
    ),
    (
        SecretCategory::BearerToken,
        r"(?i)bearer\s+(?P<value>[a-zA-Z0-9_\-\.]{20,})",
    ),
    (SecretCategory::AwsKey, r"AKIA[0-9A-Z]{16}"),
    (SecretCategory::GithubToken, r"ghp_[a-zA-Z0-9]{36}"),
    (SecretCategory::GithubToken, r"ghu_[a-zA-Z0-9]{36}"),
    (
        SecretCategory::GcpCredential,
        r#"(?i)(?:gcp|google)[_-]?(?:api[_-]?key|credentials?)\s*[:=]\s*['"]?(?P<value>[^\s'"]{10,})['"]?"#,
    ),
    (
        SecretCategory::AzureCredential,
        r#"(?i)(?:azure|az)[_-]?(?:storage[_-]?key|account[_-]?key|secret)\s*[:=]\s*['"]?(?P<value>[^\s'"]{10,})['"]?"#,
    ),
    (
        SecretCategory::JdbcPassword,
        r"(?i)jdbc:[^:]+://[^:]+:(?P<value>[^@\s]+)@",
    ),
    (
        SecretCategory::PostgresPassword,
        r"(?i)postgres(?:ql)?://[^:]+:(?P<value>[^@\s]+)@",
    ),
    (
        SecretCategory::MongodbPassword,
        r"(?i)mongodb(?:\+srv)?://[^:]+:(?P<value>[^@\s]+)@",
    ),
    (
        SecretCategory::RedisPassword,
        r"(?i)redis://[^:]*:(?P<value>[^@\s]+)@",
    ),
];

/// Values that look like `password: <value>` in system configs but are not
/// secrets (nsswitch sources, PAM control flags and modules, hash names).
static FALSE_POSITIVE_VALUES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // nsswitch.conf sources
        "files", "sss", "compat", "nis", "ldap", "systemd", "winbind", "dns",
        // PAM control flags
        "required", "requisite", "sufficient", "optional", "include", "substack",
        // generic placeholders
        "prompt", "true", "false", "yes", "no", "none", "null", "disabled", "all",
        // hash algorithms
        "sha512", "sha256", "md5", "blowfish", "yescrypt", "des",
        // PAM modules
        "pam_unix.so", "pam_deny.so", "pam_permit.so", "pam_pwquality.so", "pam_sss.so",
        "pam_faildelay.so", "pam_env.so", "pam_localuser.so", "pam_systemd.so",
        "pam_faillock.so", "pam_succeed_if.so",
    ]
    .into_iter()
    .collect()
});

static BUILTIN: Lazy<std::result::Result<PatternTable, String>> =
    Lazy::new(|| PatternTable::compile(BUILTIN_PATTERNS).map_err(|e| e.to_string()));

/// Whether a captured password value is a known non-secret keyword.
pub fn is_false_positive(value: &str) -> bool {
    FALSE_POSITIVE_VALUES.contains(value.trim().to_lowercase().as_str())
}

/// Whether the line containing byte offset `pos` is a comment line
/// (`#`, `;` or `!` after leading whitespace).
pub fn is_comment_at(text: &str, pos: usize) -> bool {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    matches!(
        text[line_start..].trim_start().chars().next(),
        Some('#' | ';' | '!')
    )
}

/// One compiled detection pattern.
#[derive(Debug, Clone)]
pub struct SecretPattern {
    category: SecretCategory,
    regex: Regex,
}

impl SecretPattern {
    pub fn category(&self) -> SecretCategory {
        self.category
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The secret within one match: the `value` group, or the whole match.
    pub fn secret_value<'t>(&self, caps: &Captures<'t>) -> &'t str {
        caps.name("value")
            .or_else(|| caps.get(0))
            .map_or("", |m| m.as_str())
    }

    /// Whether any match in `text` holds something other than a token.
    pub fn finds_secret_in(&self, text: &str) -> bool {
        self.regex
            .captures_iter(text)
            .any(|caps| !is_redaction_token(self.secret_value(&caps)))
    }

    /// Whether matches of this pattern are checked against the
    /// false-positive keyword set.
    pub fn suppresses_false_positives(&self) -> bool {
        self.category == SecretCategory::Password
    }
}

/// Compiled, ordered pattern table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    patterns: Vec<SecretPattern>,
}

impl PatternTable {
    /// Compile a table from `(category, regex)` sources, preserving order.
    ///
    /// Any pattern that fails to compile fails the whole table.
    pub fn compile(sources: &[(SecretCategory, &str)]) -> Result<Self> {
        let patterns = sources
            .iter()
            .map(|(category, source)| {
                Regex::new(source)
                    .map(|regex| SecretPattern {
                        category: *category,
                        regex,
                    })
                    .map_err(|e| {
                        RedactionError::PatternError(format!("{}: {}", category.as_str(), e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// The built-in table, compiled once per process.
    pub fn builtin() -> Result<Self> {
        BUILTIN
            .as_ref()
            .map(Clone::clone)
            .map_err(|e| RedactionError::PatternError(e.clone()))
    }

    pub fn patterns(&self) -> &[SecretPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// First category whose pattern matches anywhere in `text`, with no
    /// comment or false-positive exemption. A match whose secret is already
    /// a redaction token does not count.
    pub fn first_match(&self, text: &str) -> Option<SecretCategory> {
        self.patterns
            .iter()
            .find(|p| p.finds_secret_in(text))
            .map(|p| p.category)
    }
}
