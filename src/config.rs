//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via --config or FRAMELOG_CONFIG)
//! 3. Environment variables
//! 4. Command-line flags

use framelog_wal::frame::MAX_FRAMEABLE_PAYLOAD;
use framelog_wal::{WalConfig, DEFAULT_MAX_RECORD_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "FRAMELOG_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log file configuration.
    pub log: LogConfig,
}

impl Config {
    /// Loads configuration from `explicit` (or `FRAMELOG_CONFIG`), then
    /// applies environment variable overrides. Without a config file the
    /// defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match file {
            Some(path) => {
                let config = Self::from_file(&path)?;
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a key lookup (the environment in production).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.log.apply_overrides(lookup);
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.log.validate()
    }

    /// Serializes the configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })
    }
}

/// Log file configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Path of the log file.
    pub path: PathBuf,
    /// Maximum payload size in bytes.
    pub max_record_size: usize,
    /// Truncate a damaged tail when the log is opened for writing.
    pub repair_on_open: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./framelog.wal"),
            max_record_size: DEFAULT_MAX_RECORD_SIZE,
            repair_on_open: true,
        }
    }
}

impl LogConfig {
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("FRAMELOG_PATH") {
            self.path = PathBuf::from(path);
        }

        if let Some(size) = lookup("FRAMELOG_MAX_RECORD_SIZE") {
            if let Ok(n) = size.parse() {
                self.max_record_size = n;
            }
        }

        if let Some(repair) = lookup("FRAMELOG_REPAIR_ON_OPEN") {
            self.repair_on_open = repair == "1" || repair.to_lowercase() == "true";
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("log.path is empty".to_string()));
        }
        if self.max_record_size == 0 || self.max_record_size > MAX_FRAMEABLE_PAYLOAD {
            return Err(ConfigError::Validation(format!(
                "log.max_record_size must be between 1 and {}",
                MAX_FRAMEABLE_PAYLOAD
            )));
        }
        Ok(())
    }

    /// Builds the WAL configuration.
    pub fn wal_config(&self) -> WalConfig {
        WalConfig::new(&self.path)
            .with_max_record_size(self.max_record_size)
            .with_repair_on_open(self.repair_on_open)
    }
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}
