//! Image payload validation with format detection, limits, and timeout.
//!
//! Nothing downstream needs pixels (the embedder receives raw bytes), but a
//! payload that does not decode here would only fail later and less clearly
//! inside the embedder, so it is rejected up front.

use base64::Engine;
use image::{GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::DecodeError;

/// Image validator with configurable limits and timeout.
#[derive(Debug, Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

/// A payload that decoded successfully. Owns the original bytes.
#[derive(Debug)]
pub struct DecodedImage {
    /// The original encoded bytes
    pub bytes: Vec<u8>,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode `bytes` on a blocking thread and check the limits.
    ///
    /// The bytes are handed back inside [`DecodedImage`] so callers do not
    /// need to keep a second copy alive.
    pub async fn decode(&self, bytes: Vec<u8>) -> Result<DecodedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }
        let size = bytes.len() as u64;
        if size > self.limits.max_image_bytes {
            return Err(DecodeError::PayloadTooLarge {
                size,
                max: self.limits.max_image_bytes,
            });
        }

        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);
        let decode_result = timeout(
            timeout_duration,
            tokio::task::spawn_blocking(move || Self::decode_sync(bytes)),
        )
        .await;

        let decoded = match decode_result {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => return Err(DecodeError::Decode(format!("Task join error: {}", e))),
            Err(_) => {
                return Err(DecodeError::Timeout {
                    timeout_ms: self.limits.decode_timeout_ms,
                })
            }
        };

        let max_dim = self.limits.max_image_dimension;
        if decoded.width > max_dim || decoded.height > max_dim {
            return Err(DecodeError::ImageTooLarge {
                width: decoded.width,
                height: decoded.height,
                max_dim,
            });
        }
        Ok(decoded)
    }

    /// Synchronous decode (runs in spawn_blocking).
    fn decode_sync(bytes: Vec<u8>) -> Result<DecodedImage, DecodeError> {
        let (format, width, height) = {
            let reader = image::ImageReader::new(Cursor::new(bytes.as_slice()))
                .with_guessed_format()
                .map_err(|e| DecodeError::Decode(format!("Cannot detect image format: {}", e)))?;
            let format = reader
                .format()
                .ok_or_else(|| DecodeError::Decode("Unrecognized image format".to_string()))?;
            let image = reader
                .decode()
                .map_err(|e| DecodeError::Decode(e.to_string()))?;
            let (width, height) = image.dimensions();
            (format, width, height)
        };

        Ok(DecodedImage {
            bytes,
            format,
            width,
            height,
        })
    }
}

/// Decode a probe payload sent as plain base64 or as a `data:` URL.
///
/// Everything after the first comma is treated as the base64 payload.
pub fn decode_image_data(data: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = match data.split_once(',') {
        Some((_, rest)) => rest,
        None => data,
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| DecodeError::Base64(e.to_string()))
}
