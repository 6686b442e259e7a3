//! Error types for the Dex face matching service.
//!
//! Errors are split by concern: configuration, the embedder capability, and
//! probe matching. Per-profile ingestion failures are not errors at all; they
//! are recorded as [`FailureReason`](crate::pipeline::FailureReason) values
//! on the load report.

use thiserror::Error;

/// Top-level error type for Dex operations.
#[derive(Error, Debug)]
pub enum DexError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Outcomes of the embedder capability other than a usable embedding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedError {
    /// The image decoded but no face was (confidently) found in it
    #[error("No face detected in image")]
    NoFace,

    /// The embedding backend failed or returned something unusable
    #[error("Embedder backend error: {message}")]
    Backend {
        message: String,
        status_code: Option<u16>,
    },

    /// The embedding backend did not answer in time
    #[error("Embedder timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Image payload validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The payload is not valid base64
    #[error("Invalid base64 image data: {0}")]
    Base64(String),

    /// The payload is empty
    #[error("Image data is empty")]
    Empty,

    /// Image decoding failed
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Payload exceeds size limit
    #[error("Image payload too large ({size} bytes > {max} bytes)")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Image dimensions exceed limit
    #[error("Image too large ({width}x{height} > {max_dim})")]
    ImageTooLarge { width: u32, height: u32, max_dim: u32 },

    /// Decoding did not finish in time
    #[error("Decode timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors raised while matching a probe image.
///
/// A probe without a face is an outcome, not an error: see
/// [`MatchOutcome::NoFace`](crate::matcher::MatchOutcome::NoFace).
#[derive(Error, Debug)]
pub enum MatchError {
    /// No profiles have been loaded yet
    #[error("No profiles loaded. Call /load-profiles first")]
    NotReady,

    /// The probe payload is not a decodable image
    #[error("Invalid probe image: {0}")]
    InvalidImage(#[from] DecodeError),

    /// The embedder failed for a reason other than a missing face
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}

impl MatchError {
    /// Whether the caller is at fault (maps to a client error response).
    pub fn is_client_error(&self) -> bool {
        matches!(self, MatchError::NotReady | MatchError::InvalidImage(_))
    }
}

/// Convenience type alias for Dex results.
pub type Result<T> = std::result::Result<T, DexError>;
