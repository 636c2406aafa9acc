//! Audit configuration loading and validation.
//!
//! This module handles:
//! - Loading `config.json`
//! - Resolution order (explicit path > env > XDG > defaults)
//! - Shape checking via serde (unknown keys rejected)
//! - Semantic validation (non-zero limits, relative roots)
//! - The content hash recorded in the snapshot

use crate::collect::tool_runner::{DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CONFDRIFT_CONFIG";

/// Directory name under the XDG config home.
const CONFIG_DIR_NAME: &str = "confdrift";

const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed: {0}")]
    ValidationError(String),

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn code(&self) -> u32 {
        match self {
            ConfigError::NotFound { .. } => 12,
            ConfigError::ParseError { .. } => 13,
            ConfigError::ValidationError(_) => 11,
            ConfigError::IoError { .. } => 14,
        }
    }
}

impl From<ConfigError> for drift_common::Error {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ValidationError(msg) => drift_common::Error::ConfigValidation(msg),
            other => drift_common::Error::Config(other.to_string()),
        }
    }
}

/// Settings for one audit run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Where the inspected host's filesystem is mounted.
    pub host_root: PathBuf,
    /// Configuration root, relative to `host_root`.
    pub config_root: String,
    /// Package cache directories, relative to `host_root`.
    pub package_cache_dirs: Vec<PathBuf>,
    /// Diff owned-modified files against pristine package content.
    pub config_diffs: bool,
    /// Drop known system-generated files from the unowned set.
    pub skip_generated_noise: bool,
    pub tool_timeout_secs: u64,
    pub max_output_bytes: usize,
    /// Carried for the surrounding pipeline; classification ignores it.
    pub deep_scan: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            host_root: PathBuf::from("/"),
            config_root: "etc".to_string(),
            package_cache_dirs: vec![
                PathBuf::from("var/cache/dnf"),
                PathBuf::from("var/cache/yum"),
            ],
            config_diffs: false,
            skip_generated_noise: false,
            tool_timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            deep_scan: false,
        }
    }
}

impl AuditConfig {
    /// Host-absolute configuration root (`/etc`).
    pub fn config_prefix(&self) -> String {
        format!("/{}", self.config_root.trim_matches('/'))
    }

    /// Cache directories resolved under the host root.
    pub fn cache_dirs(&self) -> Vec<PathBuf> {
        self.package_cache_dirs
            .iter()
            .map(|d| self.host_root.join(d))
            .collect()
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tool_timeout_secs must be positive".into(),
            ));
        }
        if self.max_output_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_output_bytes must be positive".into(),
            ));
        }
        if !self.host_root.is_absolute() {
            return Err(ConfigError::ValidationError(format!(
                "host_root must be absolute (got {})",
                self.host_root.display()
            )));
        }
        let config_root = Path::new(&self.config_root);
        if self.config_root.trim_matches('/').is_empty() || !is_plain_relative(config_root) {
            return Err(ConfigError::ValidationError(format!(
                "config_root must be a non-empty relative path (got {:?})",
                self.config_root
            )));
        }
        for dir in &self.package_cache_dirs {
            if !is_plain_relative(dir) {
                return Err(ConfigError::ValidationError(format!(
                    "package cache dir must be relative to host_root (got {})",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: AuditConfig,
    /// File the config came from (None if using defaults).
    pub path: Option<PathBuf>,
    /// SHA-256 of the file content (None if using defaults).
    pub hash: Option<String>,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority; must exist).
    pub config_path: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit path (via ConfigOptions; must exist)
/// 2. `CONFDRIFT_CONFIG` (must exist)
/// 3. `$XDG_CONFIG_HOME/confdrift/config.json` or `~/.config/confdrift/config.json`
/// 4. Built-in defaults
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let explicit = options
        .config_path
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return load_from_file(&path);
    }

    if let Some(path) = xdg_config_path() {
        if path.exists() {
            return load_from_file(&path);
        }
    }

    debug!("no config file found; using defaults");
    Ok(ResolvedConfig {
        config: AuditConfig::default(),
        path: None,
        hash: None,
    })
}

fn xdg_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;
    Some(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load and validate one config file.
pub fn load_from_file(path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse_config(path, &content)?;
    info!(path = %path.display(), "loaded config");
    Ok(ResolvedConfig {
        config,
        path: Some(path.to_path_buf()),
        hash: Some(compute_hash(&content)),
    })
}

fn parse_config(path: &Path, content: &str) -> Result<AuditConfig, ConfigError> {
    let config: AuditConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
    config.validate()?;
    Ok(config)
}

/// Hex SHA-256 of config file content.
pub fn compute_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
