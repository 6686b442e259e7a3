//! Configuration management for Dex.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Dex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Image download settings
    pub acquisition: AcquisitionConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Embedder capability settings
    pub embedder: EmbedderConfig,

    /// Match decision settings
    pub matching: MatchingConfig,

    /// Ingestion settings
    pub ingest: IngestConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.dex.dex/config.toml
    /// - Linux: ~/.config/dex/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\dex\config\config.toml
    ///
    /// Falls back to ~/.dex/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "dex", "dex")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".dex").join("config.toml")
            })
    }

    /// Embedder endpoint with `${ENV_VAR}` and `~` expanded.
    pub fn embedder_endpoint(&self) -> String {
        shellexpand::full(&self.embedder.endpoint)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| self.embedder.endpoint.clone())
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
