//! Profile image acquisition.
//!
//! A profile lists several candidate URLs for its photo. They are tried in
//! order and the first one that downloads wins. Any failure (transport
//! error, timeout, non-success status, oversized body) just moves on to the
//! next reference; only "every reference failed" is reported.

use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::{AcquisitionConfig, LimitsConfig};

/// Something that can turn an ordered list of image references into bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Return the bytes of the first retrievable reference, or `None`.
    async fn acquire(&self, refs: &[String]) -> Option<Vec<u8>>;
}

/// Downloads images over HTTP(S) with a bounded per-request timeout.
pub struct HttpImageSource {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(acquisition: &AcquisitionConfig, limits: &LimitsConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(acquisition.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            timeout: Duration::from_millis(acquisition.fetch_timeout_ms),
            max_bytes: limits.max_image_bytes,
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        if resp.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(format!("body larger than {} bytes", self.max_bytes));
        }

        // Stream so an unannounced oversized body is cut off early
        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(format!("body larger than {} bytes", self.max_bytes));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn acquire(&self, refs: &[String]) -> Option<Vec<u8>> {
        for url in refs {
            match self.fetch(url).await {
                Ok(bytes) => {
                    tracing::debug!("Downloaded {} ({} bytes)", url, bytes.len());
                    return Some(bytes);
                }
                Err(e) => tracing::debug!("Image fetch failed for {}: {}", url, e),
            }
        }
        None
    }
}
