//! Face embedding capability.
//!
//! Turning pixels into a face embedding (detection, alignment, the
//! recognition model) happens outside this crate. The core only talks to it
//! through the [`Embedder`] trait:
//!
//! ```rust,ignore
//! use dex_core::embedding::{Embedder, HttpEmbedder, Strictness};
//!
//! let embedder = HttpEmbedder::from_config(&config.embedder, &endpoint);
//! let embedding = embedder.embed(&bytes, Strictness::Strict).await?;
//! // embedding.dim() == 512 for Facenet512
//! ```
//!
//! Embeddings from different embedder configurations live in different
//! spaces and must never be compared with each other.

mod http;

pub use http::HttpEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EmbedError;

/// A fixed-length face embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(vector: Vec<f32>) -> Self {
        Self(vector)
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(vector: Vec<f32>) -> Self {
        Self(vector)
    }
}

/// How hard the embedder should insist on finding a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Bulk ingestion: fast detector, uncertain detections accepted.
    Lenient,
    /// Live probes: accurate detector, no confident face means no embedding.
    Strict,
}

/// Trait implemented by every face embedding backend.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the service holds an `Arc<dyn Embedder>`).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Backend name for logging (e.g., "http").
    fn name(&self) -> &str;

    /// Recognition model identifier reported by `/health`.
    fn model(&self) -> &str;

    /// Embed the single most prominent face in `image`.
    ///
    /// Returns [`EmbedError::NoFace`] when no face qualifies under the given
    /// strictness.
    async fn embed(&self, image: &[u8], strictness: Strictness)
        -> Result<Embedding, EmbedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_dim() {
        let e = Embedding::new(vec![0.1, 0.2, 0.3]);
        assert_eq!(e.dim(), 3);
        assert_eq!(e.as_slice(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_embedding_serializes_as_array() {
        let e = Embedding::from(vec![1.0, 2.0]);
        assert_eq!(serde_json::to_string(&e).unwrap(), "[1.0,2.0]");
    }
}
