//! Configuration for the audit workflow.
//!
//! Supports YAML file and environment variable overrides.

use crate::checkpoint::RecordFormat;
use crate::store::{FileMachineStore, InMemoryMachineStore, MachineStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Config file read when `AUDITFLOW_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "auditflow.yaml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Machine instance storage.
    pub storage: StorageConfig,
    /// Dispatch guard tuning.
    pub dispatch: DispatchConfig,
}

/// Which machine store to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
}

impl StorageBackend {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "memory" => Some(Self::Memory),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the file backend.
    pub path: PathBuf,
    /// Record encoding of the file backend.
    pub format: RecordFormat,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from("./data/machines"),
            format: RecordFormat::Json,
        }
    }
}

impl StorageConfig {
    /// Open the configured store.
    pub fn open(&self) -> Arc<dyn MachineStore> {
        match self.backend {
            StorageBackend::Memory => Arc::new(InMemoryMachineStore::new()),
            StorageBackend::File => Arc::new(FileMachineStore::new(&self.path, self.format)),
        }
    }
}

/// Retry policy of the dispatch guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Retries after a version conflict or a transient storage failure.
    pub max_conflict_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_backoff_ms: u64,
    /// Upper bound on the retry delay.
    pub max_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 5,
            retry_backoff_ms: 10,
            max_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Load configuration from the file named by `AUDITFLOW_CONFIG` (or
    /// `auditflow.yaml`) if it exists, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("AUDITFLOW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(backend) = lookup("AUDITFLOW_STORAGE_BACKEND") {
            self.storage.backend = StorageBackend::from_name(&backend).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown storage backend {backend:?}"))
            })?;
        }

        if let Some(path) = lookup("AUDITFLOW_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Some(format) = lookup("AUDITFLOW_STORAGE_FORMAT") {
            self.storage.format = RecordFormat::from_name(&format).ok_or_else(|| {
                ConfigError::Invalid(format!("unknown record format {format:?}"))
            })?;
        }

        if let Some(retries) = lookup("AUDITFLOW_MAX_CONFLICT_RETRIES") {
            self.dispatch.max_conflict_retries = retries.parse().map_err(|_| {
                ConfigError::Invalid(format!("max conflict retries {retries:?} is not a number"))
            })?;
        }

        Ok(())
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::File && self.storage.path.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid(
                "file storage requires storage.path".to_string(),
            ));
        }
        if self.dispatch.max_backoff_ms < self.dispatch.retry_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "dispatch.max_backoff_ms ({}) is below dispatch.retry_backoff_ms ({})",
                self.dispatch.max_backoff_ms, self.dispatch.retry_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}': {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::File);
        assert_eq!(config.storage.path, PathBuf::from("./data/machines"));
        assert_eq!(config.storage.format, RecordFormat::Json);
        assert_eq!(config.dispatch.max_conflict_retries, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
storage:
  backend: file
  path: /var/lib/auditflow
  format: binary
dispatch:
  max_conflict_retries: 2
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/auditflow"));
        assert_eq!(config.storage.format, RecordFormat::Binary);
        assert_eq!(config.dispatch.max_conflict_retries, 2);
        assert_eq!(config.dispatch.retry_backoff_ms, 10);
    }

    #[test]
    fn test_parse_rejects_unknown_backend() {
        let yaml = "storage:\n  backend: postgres\n";
        assert!(matches!(Config::from_yaml(yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("AUDITFLOW_STORAGE_BACKEND", "memory"),
                ("AUDITFLOW_STORAGE_FORMAT", "bincode"),
                ("AUDITFLOW_MAX_CONFLICT_RETRIES", "9"),
            ]))
            .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.format, RecordFormat::Binary);
        assert_eq!(config.dispatch.max_conflict_retries, 9);
    }

    #[test]
    fn test_bad_env_override_is_reported() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("AUDITFLOW_MAX_CONFLICT_RETRIES", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_validate_backoff_bounds() {
        let mut config = Config::default();
        config.dispatch.retry_backoff_ms = 1000;
        config.dispatch.max_backoff_ms = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/auditflow.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(path, _) if path == "/nonexistent/auditflow.yaml"));
    }
}
