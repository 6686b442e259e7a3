//! In-memory collaborators for unit tests.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::embedding::{Embedder, Embedding, Strictness};
use crate::error::EmbedError;
use crate::pipeline::ImageSource;

/// A small PNG whose bytes are unique per `shade`.
pub fn png(shade: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 4, Rgb([shade, shade, shade]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// Serves fixed bytes per URL; unknown URLs fail.
#[derive(Default)]
pub struct FakeSource {
    images: HashMap<String, Vec<u8>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    pub requests: AtomicUsize,
    /// Highest number of `acquire` calls seen running at once
    pub peak: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl ImageSource for FakeSource {
    async fn acquire(&self, refs: &[String]) -> Option<Vec<u8>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let found = refs.iter().find_map(|url| {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.images.get(url).cloned()
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        found
    }
}

/// Maps exact image bytes to a canned embedder answer; anything else has no face.
#[derive(Default)]
pub struct FakeEmbedder {
    answers: HashMap<Vec<u8>, Result<Embedding, EmbedError>>,
    pub calls: std::sync::Mutex<Vec<Strictness>>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, image: Vec<u8>, vector: Vec<f32>) -> Self {
        self.answers.insert(image, Ok(Embedding::new(vector)));
        self
    }

    pub fn with_error(mut self, image: Vec<u8>, error: EmbedError) -> Self {
        self.answers.insert(image, Err(error));
        self
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn embed(
        &self,
        image: &[u8],
        strictness: Strictness,
    ) -> Result<Embedding, EmbedError> {
        self.calls.lock().unwrap().push(strictness);
        self.answers
            .get(image)
            .cloned()
            .unwrap_or(Err(EmbedError::NoFace))
    }
}
