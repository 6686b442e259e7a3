//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// Largest accepted request body (probe images arrive base64-encoded)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            max_body_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Profile image download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Per-URL fetch timeout in milliseconds
    pub fetch_timeout_ms: u64,

    /// User-Agent header sent with image requests
    pub user_agent: String,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
            user_agent: format!("dex/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest image payload accepted, in bytes
    pub max_image_bytes: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 20 * 1024 * 1024,
            max_image_dimension: 10_000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Embedder capability settings.
///
/// The threshold in [`MatchingConfig`] is calibrated for `model`; changing
/// the model means re-deriving the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Base URL of the face representation service (supports ${ENV_VAR})
    pub endpoint: String,

    /// Recognition model name
    pub model: String,

    /// Detector used for live probes (strict mode)
    pub strict_detector: String,

    /// Detector used for bulk ingestion (lenient mode)
    pub lenient_detector: String,

    /// Align faces before embedding
    pub align: bool,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5005".to_string(),
            model: "Facenet512".to_string(),
            strict_detector: "retinaface".to_string(),
            lenient_detector: "opencv".to_string(),
            align: true,
            timeout_ms: 30_000,
        }
    }
}

/// Match decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Cosine distance strictly below which the best candidate is a match.
    /// 0.45 is lenient for Facenet512; 0.30 is strict.
    pub threshold: f32,

    /// Number of candidates reported with every result
    pub top_k: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: 0.45,
            top_k: 3,
        }
    }
}

/// Ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Profiles downloaded and embedded concurrently
    pub parallel_workers: usize,

    /// Deadline for a whole load operation in milliseconds
    pub load_timeout_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            load_timeout_ms: 600_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
