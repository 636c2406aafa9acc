//! Plain records exchanged between collectors, the classifier, the redactor
//! and the renderers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a file under the configuration root relates to the package database.
///
/// Assigned once by the classifier and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKind {
    /// Owned by an installed package and reported changed by the verifier.
    OwnedModified,
    /// Not owned by any installed package.
    Unowned,
    /// Shipped by a package that has since been removed.
    Orphaned,
}

impl ConfigKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::OwnedModified => "owned_modified",
            ConfigKind::Unowned => "unowned",
            ConfigKind::Orphaned => "orphaned",
        }
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of package verification output: a packaged file that differs
/// from its shipped state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VerificationRecord {
    /// Absolute path on the inspected host.
    pub path: String,
    /// Verifier flag string (e.g. `S.5....T.`), preserved verbatim.
    pub flags: String,
    /// Owning package when the verifier or a later lookup knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl VerificationRecord {
    pub fn new(path: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            flags: flags.into(),
            package: None,
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }
}

/// Secret type tag attached to every redaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SecretCategory {
    /// PEM private key block.
    PrivateKey,
    /// `api_key=` style assignment.
    ApiKey,
    /// `token=` style assignment.
    Token,
    /// `password=` / `passwd:` / `pass=` style assignment.
    Password,
    /// `secret=` style assignment.
    Secret,
    /// HTTP bearer token.
    BearerToken,
    /// AWS access key id (AKIA...).
    AwsKey,
    /// GitHub personal or user-to-server token.
    GithubToken,
    /// Google Cloud API key or credentials assignment.
    GcpCredential,
    /// Azure storage/account key or secret assignment.
    AzureCredential,
    /// Password embedded in a JDBC URL.
    JdbcPassword,
    /// Password embedded in a PostgreSQL URI.
    PostgresPassword,
    /// Password embedded in a MongoDB URI.
    MongodbPassword,
    /// Password embedded in a Redis URI.
    RedisPassword,
    /// Whole file withheld because of its path.
    ExcludedPath,
}

impl SecretCategory {
    /// Tag used inside redaction tokens and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretCategory::PrivateKey => "PRIVATE_KEY",
            SecretCategory::ApiKey => "API_KEY",
            SecretCategory::Token => "TOKEN",
            SecretCategory::Password => "PASSWORD",
            SecretCategory::Secret => "SECRET",
            SecretCategory::BearerToken => "BEARER_TOKEN",
            SecretCategory::AwsKey => "AWS_KEY",
            SecretCategory::GithubToken => "GITHUB_TOKEN",
            SecretCategory::GcpCredential => "GCP_CREDENTIAL",
            SecretCategory::AzureCredential => "AZURE_CREDENTIAL",
            SecretCategory::JdbcPassword => "JDBC_PASSWORD",
            SecretCategory::PostgresPassword => "POSTGRES_PASSWORD",
            SecretCategory::MongodbPassword => "MONGODB_PASSWORD",
            SecretCategory::RedisPassword => "REDIS_PASSWORD",
            SecretCategory::ExcludedPath => "EXCLUDED_PATH",
        }
    }

    /// Fixed operator guidance for this category.
    pub fn remediation(&self) -> &'static str {
        match self {
            SecretCategory::ExcludedPath => {
                "File not included; handle credentials manually (e.g. systemd credential, secret store)."
            }
            SecretCategory::PrivateKey => {
                "Provision the key at deploy time (secret store, systemd credential); never bake it into the image."
            }
            SecretCategory::AwsKey
            | SecretCategory::GcpCredential
            | SecretCategory::AzureCredential => {
                "Rotate the cloud credential and inject it at deploy time (instance role, workload identity, secret store)."
            }
            SecretCategory::JdbcPassword
            | SecretCategory::PostgresPassword
            | SecretCategory::MongodbPassword
            | SecretCategory::RedisPassword => {
                "Move the database password out of the connection string and inject it at deploy time."
            }
            SecretCategory::ApiKey
            | SecretCategory::Token
            | SecretCategory::Password
            | SecretCategory::Secret
            | SecretCategory::BearerToken
            | SecretCategory::GithubToken => "Use a secret store or inject at deploy time.",
        }
    }
}

impl std::fmt::Display for SecretCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where inside a record a redaction was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RedactionLocation {
    /// A match inside captured file content.
    #[serde(rename = "content")]
    Content,
    /// A match inside the stored unified diff.
    #[serde(rename = "diff")]
    Diff,
    /// The whole file was withheld.
    #[serde(rename = "entire file")]
    EntireFile,
}

impl RedactionLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedactionLocation::Content => "content",
            RedactionLocation::Diff => "diff",
            RedactionLocation::EntireFile => "entire file",
        }
    }
}

/// One audit entry for a detected or excluded secret.
///
/// Entries are append-only and never deduplicated: two matches in one file
/// produce two entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RedactionRecord {
    /// Source file path.
    pub path: String,
    /// Secret type tag.
    #[serde(rename = "pattern")]
    pub category: SecretCategory,
    /// Which part of the record was touched.
    #[serde(rename = "line")]
    pub location: RedactionLocation,
    /// Operator guidance, fixed per category.
    pub remediation: String,
}

impl RedactionRecord {
    pub fn new(path: impl Into<String>, category: SecretCategory, location: RedactionLocation) -> Self {
        Self {
            path: path.into(),
            category,
            location,
            remediation: category.remediation().to_string(),
        }
    }
}

/// A non-fatal note produced during a run (degraded query, missing archive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    /// Component that produced the warning.
    pub source: String,
    pub message: String,
}

impl Warning {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serializes_as_tag() {
        assert_eq!(
            serde_json::to_string(&SecretCategory::PrivateKey).unwrap(),
            "\"PRIVATE_KEY\""
        );
        assert_eq!(
            serde_json::to_string(&SecretCategory::ExcludedPath).unwrap(),
            "\"EXCLUDED_PATH\""
        );
        assert_eq!(SecretCategory::AwsKey.as_str(), "AWS_KEY");
    }

    #[test]
    fn test_redaction_record_json_shape() {
        let record = RedactionRecord::new(
            "/etc/shadow",
            SecretCategory::ExcludedPath,
            RedactionLocation::EntireFile,
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["path"], "/etc/shadow");
        assert_eq!(value["pattern"], "EXCLUDED_PATH");
        assert_eq!(value["line"], "entire file");
        assert!(value["remediation"]
            .as_str()
            .unwrap()
            .contains("handle credentials manually"));
    }

    #[test]
    fn test_remediation_fixed_per_category() {
        let a = RedactionRecord::new("/a", SecretCategory::Password, RedactionLocation::Content);
        let b = RedactionRecord::new("/b", SecretCategory::Password, RedactionLocation::Diff);
        assert_eq!(a.remediation, b.remediation);
    }

    #[test]
    fn test_verification_record_package_optional() {
        let rec = VerificationRecord::new("/etc/ssh/sshd_config", "S.5....T.");
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("package"));

        let rec = rec.with_package("openssh-server");
        assert_eq!(rec.package.as_deref(), Some("openssh-server"));
    }

    #[test]
    fn test_config_kind_names() {
        assert_eq!(ConfigKind::OwnedModified.to_string(), "owned_modified");
        assert_eq!(
            serde_json::to_string(&ConfigKind::Orphaned).unwrap(),
            "\"orphaned\""
        );
    }
}
