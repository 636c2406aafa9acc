//! Deterministic redaction tokens.
//!
//! A token carries the secret category and a truncated SHA-256 digest of the
//! original value, so identical secrets across files produce identical
//! tokens and a reviewer can tell "same password reused" without seeing it.

use drift_common::SecretCategory;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Number of hex characters of the digest kept in a token.
pub const TOKEN_HASH_HEX_LEN: usize = 8;

/// Fixed token that replaces a whole PEM private key block.
pub const PRIVATE_KEY_TOKEN: &str = "REDACTED_PRIVATE_KEY_<removed>";

static TOKEN_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^REDACTED_[A-Z_]+_(?:[0-9a-f]{8}|<removed>)$").expect("token shape regex")
});

/// Whether `value` is exactly a token this crate emits.
///
/// Keyword patterns capture whatever follows `token:` or `Bearer`, which
/// includes tokens written by an earlier pattern in the same pass.
pub fn is_redaction_token(value: &str) -> bool {
    TOKEN_SHAPE.is_match(value)
}

/// Truncated hex SHA-256 of `value`.
pub fn token_digest(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(TOKEN_HASH_HEX_LEN);
    hex
}

/// Build the replacement token for a secret of `category` with the given value.
pub fn redaction_token(category: SecretCategory, value: &str) -> String {
    match category {
        SecretCategory::PrivateKey => PRIVATE_KEY_TOKEN.to_string(),
        _ => format!("REDACTED_{}_{}", category.as_str(), token_digest(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(token_digest("hunter2"), token_digest("hunter2"));
        assert_ne!(token_digest("hunter2"), token_digest("hunter3"));
    }

    #[test]
    fn test_digest_known_value() {
        // sha256("hunter2") = f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7
        assert_eq!(token_digest("hunter2"), "f52fbd32");
    }

    #[test]
    fn test_token_format() {
        let token = redaction_token(SecretCategory::Password, "hunter2");
        assert!(token.starts_with("REDACTED_PASSWORD_"));
        let hex = token.trim_start_matches("REDACTED_PASSWORD_");
        assert_eq!(hex.len(), TOKEN_HASH_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_shape_recognized() {
        assert!(is_redaction_token(&redaction_token(SecretCategory::BearerToken, "x")));
        assert!(is_redaction_token(&redaction_token(SecretCategory::JdbcPassword, "x")));
        assert!(is_redaction_token(PRIVATE_KEY_TOKEN));
        assert!(!is_redaction_token("REDACTED_PASSWORD_f52fbd32trailing"));
        assert!(!is_redaction_token("REDACTED_PASSWORD_F52FBD32"));
        assert!(!is_redaction_token("abcdefghijklmnopqrstuvwxyz0123"));
    }

    #[test]
    fn test_private_key_token_is_fixed() {
        assert_eq!(
            redaction_token(SecretCategory::PrivateKey, "a"),
            redaction_token(SecretCategory::PrivateKey, "b")
        );
    }
}
