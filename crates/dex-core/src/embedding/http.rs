//! HTTP embedder backed by an external face representation service.
//!
//! Speaks the `/represent` JSON API: the image goes out as a base64 data
//! URL together with the model, detector backend and detection policy, and
//! one embedding per detected face comes back.

use super::{Embedder, Embedding, Strictness};
use crate::config::EmbedderConfig;
use crate::error::EmbedError;
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Embedder that delegates to a remote face representation service.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    strict_detector: String,
    lenient_detector: String,
    align: bool,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Build an embedder from config. `endpoint` is the already-expanded URL.
    pub fn from_config(config: &EmbedderConfig, endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            strict_detector: config.strict_detector.clone(),
            lenient_detector: config.lenient_detector.clone(),
            align: config.align,
            timeout: Duration::from_millis(config.timeout_ms),
            client: reqwest::Client::new(),
        }
    }

    fn request_for<'a>(&'a self, image: &[u8], strictness: Strictness) -> RepresentRequest<'a> {
        let (detector, enforce) = match strictness {
            Strictness::Strict => (&self.strict_detector, true),
            Strictness::Lenient => (&self.lenient_detector, false),
        };
        RepresentRequest {
            img: data_url(image),
            model_name: &self.model,
            detector_backend: detector,
            enforce_detection: enforce,
            align: self.align,
        }
    }
}

/// `/represent` request body.
#[derive(Serialize)]
struct RepresentRequest<'a> {
    img: String,
    model_name: &'a str,
    detector_backend: &'a str,
    enforce_detection: bool,
    align: bool,
}

/// `/represent` response body.
#[derive(Deserialize)]
struct RepresentResponse {
    #[serde(default)]
    results: Vec<RepresentedFace>,
}

#[derive(Deserialize)]
struct RepresentedFace {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn name(&self) -> &str {
        "http"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        image: &[u8],
        strictness: Strictness,
    ) -> Result<Embedding, EmbedError> {
        let url = format!("{}/represent", self.endpoint);
        let start = Instant::now();
        let body = self.request_for(image, strictness);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbedError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    EmbedError::Backend {
                        message: format!("Embedder request failed: {e}"),
                        status_code: None,
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            // Enforced detection reports a missing face as a client error
            if status.is_client_error() && text.to_ascii_lowercase().contains("face") {
                return Err(EmbedError::NoFace);
            }
            return Err(EmbedError::Backend {
                message: format!("Embedder HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let parsed: RepresentResponse = resp.json().await.map_err(|e| EmbedError::Backend {
            message: format!("Failed to parse embedder response: {e}"),
            status_code: None,
        })?;

        let face = parsed
            .results
            .into_iter()
            .next()
            .filter(|f| !f.embedding.is_empty())
            .ok_or(EmbedError::NoFace)?;

        tracing::trace!(
            "Embedded face ({} dims, {:?}) in {:?}",
            face.embedding.len(),
            strictness,
            start.elapsed()
        );
        Ok(Embedding::new(face.embedding))
    }
}

/// Encode image bytes as a data URL, sniffing the media type.
fn data_url(bytes: &[u8]) -> String {
    let media_type = image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/jpeg");
    format!(
        "data:{};base64,{}",
        media_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
