//! Dex Core - in-memory face matching library.
//!
//! Dex enrolls a batch of profiles (downloading each profile's photo and
//! computing a face embedding for it) and later matches live camera
//! captures against that gallery.
//!
//! # Architecture
//!
//! ```text
//! load:  profiles → acquire image → validate → embed (lenient) → gallery → store
//! match: probe → validate → embed (strict) → rank against store → decision
//! ```
//!
//! The embedder is an external capability behind [`Embedder`]; everything
//! else lives in memory and is rebuilt on every load.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dex_core::{Config, FaceService, MatchOutcome};
//!
//! #[tokio::main]
//! async fn main() -> dex_core::Result<()> {
//!     let service = FaceService::from_config(&Config::load()?)?;
//!     let report = service.load_profiles(profiles).await;
//!     println!("computed {} of {}", report.computed, report.total);
//!
//!     let outcome = service.match_face(probe_bytes).await?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod matcher;
pub mod pipeline;
pub mod profile;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::Config;
pub use embedding::{Embedder, Embedding, HttpEmbedder, Strictness};
pub use error::{ConfigError, DecodeError, DexError, EmbedError, MatchError, Result};
pub use matcher::{MatchCandidate, MatchDecision, MatchOutcome, Matcher};
pub use pipeline::{FailureReason, ImageSource, LoadReport, ProfileOutcome, ProfileStatus};
pub use profile::Profile;
pub use store::{EmbeddingStore, Gallery};

use std::sync::Arc;
use std::time::Instant;

use pipeline::{HttpImageSource, ImageDecoder, Ingestor};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The face matching service: one store, one embedder, one matcher.
///
/// Loads replace the whole gallery and are serialized against each other;
/// matches read an `Arc` snapshot and may run concurrently with anything.
pub struct FaceService {
    embedder: Arc<dyn Embedder>,
    store: EmbeddingStore,
    ingestor: Ingestor,
    matcher: Matcher,
    decoder: ImageDecoder,
    load_lock: tokio::sync::Mutex<()>,
}

impl FaceService {
    /// Create a service around injected collaborators.
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>, source: Arc<dyn ImageSource>) -> Self {
        let decoder = ImageDecoder::new(config.limits.clone());
        tracing::debug!(
            "Initializing Dex v{} with embedder {} ({})",
            VERSION,
            embedder.name(),
            embedder.model()
        );
        Self {
            ingestor: Ingestor::new(source, embedder.clone(), decoder.clone(), &config.ingest),
            embedder,
            store: EmbeddingStore::new(),
            matcher: Matcher::from_config(&config.matching),
            decoder,
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a service using the HTTP embedder and HTTP image source.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.embedder_endpoint();
        let embedder = Arc::new(HttpEmbedder::from_config(&config.embedder, &endpoint));
        let source = Arc::new(HttpImageSource::new(&config.acquisition, &config.limits)?);
        Ok(Self::new(config, embedder, source))
    }

    /// Replace the gallery with the profiles of `batch` that embed successfully.
    ///
    /// The previous gallery stays visible to matches until the new one is
    /// complete, then is swapped out in one step.
    pub async fn load_profiles(&self, batch: Vec<Profile>) -> LoadReport {
        let _writer = self.load_lock.lock().await;
        let start = Instant::now();
        tracing::info!("Loading {} profiles", batch.len());

        let (gallery, report) = self.ingestor.build(&batch).await;
        self.install(gallery, report, start)
    }

    /// Same as [`load_profiles`](Self::load_profiles) for raw JSON entries.
    ///
    /// Entries that are not JSON objects are reported as failed profiles
    /// instead of rejecting the batch.
    pub async fn load_records(&self, records: Vec<serde_json::Value>) -> LoadReport {
        let _writer = self.load_lock.lock().await;
        let start = Instant::now();
        tracing::info!("Loading {} profiles", records.len());

        let (gallery, report) = self.ingestor.build_records(records).await;
        self.install(gallery, report, start)
    }

    fn install(&self, gallery: Gallery, report: LoadReport, start: Instant) -> LoadReport {
        self.store.replace(gallery);
        tracing::info!(
            "Profile load complete in {:?}: {} computed, {} failed, {} total",
            start.elapsed(),
            report.computed,
            report.failed,
            report.total
        );
        report
    }

    /// Identify the face in a probe image.
    pub async fn match_face(&self, probe: Vec<u8>) -> std::result::Result<MatchOutcome, MatchError> {
        let start = Instant::now();
        let gallery = self.store.snapshot();
        if gallery.is_empty() {
            return Err(MatchError::NotReady);
        }

        let decoded = self.decoder.decode(probe).await?;
        let embedding = match self.embedder.embed(&decoded.bytes, Strictness::Strict).await {
            Ok(embedding) => embedding,
            Err(EmbedError::NoFace) => {
                tracing::debug!("No face detected in probe");
                return Ok(MatchOutcome::NoFace);
            }
            Err(e) => return Err(e.into()),
        };
        if gallery.dim() != Some(embedding.dim()) {
            tracing::warn!(
                "Probe embedding has {} dimensions, gallery has {:?}",
                embedding.dim(),
                gallery.dim()
            );
        }

        let decision = self.matcher.decide(&embedding, &gallery);
        let elapsed = start.elapsed();
        match &decision {
            MatchDecision::Matched { best, .. } => tracing::info!(
                "Matched {} (distance {:.4}) in {:?}",
                best.profile_id,
                best.distance,
                elapsed
            ),
            MatchDecision::NoConfidentMatch { best_distance, .. } => tracing::info!(
                "No confident match (best distance {:?}, threshold {})",
                best_distance,
                self.matcher.threshold()
            ),
        }
        Ok(MatchOutcome::Decided { decision, elapsed })
    }

    /// Number of profiles in the current gallery.
    pub fn profiles_loaded(&self) -> usize {
        self.store.len()
    }

    /// Recognition model of the configured embedder.
    pub fn model(&self) -> &str {
        self.embedder.model()
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }
}
