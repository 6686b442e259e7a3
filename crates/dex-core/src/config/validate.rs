//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_body_bytes must be > 0".into(),
            ));
        }
        if self.acquisition.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "acquisition.fetch_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.max_image_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_bytes must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.embedder.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "embedder.timeout_ms must be > 0".into(),
            ));
        }
        if self.embedder.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "embedder.model must not be empty".into(),
            ));
        }
        if !(self.matching.threshold > 0.0 && self.matching.threshold <= 2.0) {
            return Err(ConfigError::ValidationError(
                "matching.threshold must be in (0.0, 2.0]".into(),
            ));
        }
        if self.matching.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "matching.top_k must be > 0".into(),
            ));
        }
        if self.ingest.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.parallel_workers must be > 0".into(),
            ));
        }
        if self.ingest.load_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.load_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
