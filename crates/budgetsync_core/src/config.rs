//! Registry configuration.
//!
//! Values come from an optional TOML file, then environment overrides.
//! Every field has a default, so an empty file is a valid configuration.

use crate::service::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_DATABASE_PATH: &str = "BUDGETSYNC_DATABASE_PATH";
pub const ENV_LOG_LEVEL: &str = "BUDGETSYNC_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub database_path: PathBuf,
    pub busy_timeout_ms: u64,
    pub retry: RetryConfig,
    /// Falls back to `default_log_level()` when unset.
    pub log_level: Option<String>,
    /// File logging is disabled when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("account.sqlite"),
            busy_timeout_ms: 5_000,
            retry: RetryConfig::default(),
            log_level: None,
            log_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Loads a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `BUDGETSYNC_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(ENV_DATABASE_PATH).filter(|value| !value.trim().is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            self.log_level = Some(level);
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }
}
