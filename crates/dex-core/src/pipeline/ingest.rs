//! Batch ingestion: profiles in, gallery out.
//!
//! Each profile goes through reference extraction, download, validation and
//! lenient embedding. Those steps are independent per profile and run for
//! up to `parallel_workers` profiles at once; results are applied to the new
//! gallery strictly in input order. A failing profile is recorded with a
//! reason and never stops the batch.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::IngestConfig;
use crate::embedding::{Embedder, Embedding, Strictness};
use crate::error::EmbedError;
use crate::profile::Profile;
use crate::store::Gallery;

use super::acquire::ImageSource;
use super::decode::ImageDecoder;

/// Why a profile did not make it into the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    InvalidRecord,
    MissingIdentifier,
    NoImageReferences,
    DownloadFailed,
    DecodeFailed(String),
    NoFace,
    EmbeddingFailed(String),
    DimensionMismatch { expected: usize, actual: usize },
    DeadlineExceeded,
}

impl FailureReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::InvalidRecord => "invalid_record",
            FailureReason::MissingIdentifier => "missing_identifier",
            FailureReason::NoImageReferences => "no_image_references",
            FailureReason::DownloadFailed => "download_failed",
            FailureReason::DecodeFailed(_) => "decode_failed",
            FailureReason::NoFace => "no_face",
            FailureReason::EmbeddingFailed(_) => "embedding_failed",
            FailureReason::DimensionMismatch { .. } => "dimension_mismatch",
            FailureReason::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::InvalidRecord => write!(f, "entry is not a profile object"),
            FailureReason::MissingIdentifier => write!(f, "profile has no identifier"),
            FailureReason::NoImageReferences => write!(f, "profile has no image references"),
            FailureReason::DownloadFailed => write!(f, "no image reference could be downloaded"),
            FailureReason::DecodeFailed(msg) => write!(f, "downloaded image is invalid: {msg}"),
            FailureReason::NoFace => write!(f, "no face found"),
            FailureReason::EmbeddingFailed(msg) => write!(f, "embedding failed: {msg}"),
            FailureReason::DimensionMismatch { expected, actual } => write!(
                f,
                "embedding has {actual} dimensions, gallery uses {expected}"
            ),
            FailureReason::DeadlineExceeded => write!(f, "load deadline exceeded"),
        }
    }
}

impl Serialize for FailureReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// What happened to one profile of the batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileStatus {
    Computed,
    Failed(FailureReason),
}

/// Per-profile audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutcome {
    /// Position in the submitted batch
    pub index: usize,
    pub profile_id: Option<String>,
    pub name: Option<String>,
    pub status: ProfileStatus,
}

impl ProfileOutcome {
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            ProfileStatus::Failed(reason) => Some(reason),
            ProfileStatus::Computed => None,
        }
    }
}

/// Aggregate result of one load operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub computed: usize,
    pub failed: usize,
    pub total: usize,
    pub outcomes: Vec<ProfileOutcome>,
}

impl LoadReport {
    /// Outcomes of the profiles that failed, in batch order.
    pub fn failures(&self) -> impl Iterator<Item = (&ProfileOutcome, &FailureReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.failure().map(|reason| (o, reason)))
    }

    fn record(&mut self, index: usize, profile: Option<&Profile>, status: ProfileStatus) {
        match &status {
            ProfileStatus::Computed => self.computed += 1,
            ProfileStatus::Failed(_) => self.failed += 1,
        }
        self.outcomes.push(ProfileOutcome {
            index,
            profile_id: profile.and_then(|p| p.id()).map(|id| id.into_owned()),
            name: profile.and_then(|p| p.display_name()).map(String::from),
            status,
        });
    }
}

/// Builds galleries from profile batches.
pub struct Ingestor {
    source: Arc<dyn ImageSource>,
    embedder: Arc<dyn Embedder>,
    decoder: ImageDecoder,
    parallel: usize,
    deadline: Duration,
}

impl Ingestor {
    pub fn new(
        source: Arc<dyn ImageSource>,
        embedder: Arc<dyn Embedder>,
        decoder: ImageDecoder,
        config: &IngestConfig,
    ) -> Self {
        Self {
            source,
            embedder,
            decoder,
            parallel: config.parallel_workers.max(1),
            deadline: Duration::from_millis(config.load_timeout_ms),
        }
    }

    /// Process a batch into a fresh gallery plus its report.
    ///
    /// Profiles still pending when the load deadline passes are recorded as
    /// [`FailureReason::DeadlineExceeded`].
    pub async fn build(&self, profiles: &[Profile]) -> (Gallery, LoadReport) {
        let entries: Vec<Option<&Profile>> = profiles.iter().map(Some).collect();
        self.run(&entries).await
    }

    /// Like [`build`](Self::build), for raw JSON entries of a submitted batch.
    ///
    /// Entries that are not JSON objects fail with
    /// [`FailureReason::InvalidRecord`] and keep their batch index.
    pub async fn build_records(&self, records: Vec<Value>) -> (Gallery, LoadReport) {
        let parsed: Vec<Option<Profile>> = records.into_iter().map(Profile::from_record).collect();
        let entries: Vec<Option<&Profile>> = parsed.iter().map(Option::as_ref).collect();
        self.run(&entries).await
    }

    async fn run(&self, entries: &[Option<&Profile>]) -> (Gallery, LoadReport) {
        let mut gallery = Gallery::new();
        let mut report = LoadReport {
            total: entries.len(),
            ..LoadReport::default()
        };

        let deadline = tokio::time::Instant::now() + self.deadline;
        // Index-driven so each future owns only `Copy` data
        let mut prepared = std::pin::pin!(stream::iter(0..entries.len())
            .map(|index| {
                let entry = entries[index];
                async move { (index, self.prepare(entry).await) }
            })
            .buffered(self.parallel));

        let mut done = 0;
        loop {
            match tokio::time::timeout_at(deadline, prepared.next()).await {
                Ok(Some((index, result))) => {
                    let entry = entries[index];
                    let status = match result.and_then(|e| check_dim(&gallery, e)) {
                        Ok(embedding) => {
                            if let Some((profile, id)) =
                                entry.and_then(|p| p.id().map(|id| (p, id.into_owned())))
                            {
                                tracing::info!("Computed embedding for: {}", profile.label());
                                gallery.insert(id, embedding, profile.clone());
                            }
                            ProfileStatus::Computed
                        }
                        Err(reason) => {
                            let label = entry.map_or_else(
                                || format!("entry {index}"),
                                |p| p.label().into_owned(),
                            );
                            tracing::warn!("Skipped {}: {}", label, reason);
                            ProfileStatus::Failed(reason)
                        }
                    };
                    report.record(index, entry, status);
                    done += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "Load deadline of {:?} exceeded after {}/{} profiles",
                        self.deadline,
                        done,
                        entries.len()
                    );
                    break;
                }
            }
        }

        for (index, entry) in entries.iter().enumerate().skip(done) {
            report.record(
                index,
                *entry,
                ProfileStatus::Failed(FailureReason::DeadlineExceeded),
            );
        }

        (gallery, report)
    }

    /// Steps that need no shared state: refs, download, validate, embed.
    async fn prepare(&self, entry: Option<&Profile>) -> Result<Embedding, FailureReason> {
        let profile = entry.ok_or(FailureReason::InvalidRecord)?;
        if profile.id().is_none() {
            return Err(FailureReason::MissingIdentifier);
        }
        let refs = profile.image_refs();
        if refs.is_empty() {
            return Err(FailureReason::NoImageReferences);
        }

        let bytes = self
            .source
            .acquire(&refs)
            .await
            .ok_or(FailureReason::DownloadFailed)?;

        let decoded = self
            .decoder
            .decode(bytes)
            .await
            .map_err(|e| FailureReason::DecodeFailed(e.to_string()))?;

        self.embedder
            .embed(&decoded.bytes, Strictness::Lenient)
            .await
            .map_err(|e| match e {
                EmbedError::NoFace => FailureReason::NoFace,
                other => FailureReason::EmbeddingFailed(other.to_string()),
            })
    }
}

/// Every embedding in one gallery must share a dimensionality.
fn check_dim(gallery: &Gallery, embedding: Embedding) -> Result<Embedding, FailureReason> {
    match gallery.dim() {
        Some(expected) if expected != embedding.dim() => Err(FailureReason::DimensionMismatch {
            expected,
            actual: embedding.dim(),
        }),
        _ => Ok(embedding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitsConfig;
    use crate::testing::{png, FakeEmbedder, FakeSource};
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn profile(value: serde_json::Value) -> Profile {
        serde_json::from_value(value).unwrap()
    }

    fn ingestor(source: FakeSource, embedder: FakeEmbedder, config: IngestConfig) -> Ingestor {
        Ingestor::new(
            Arc::new(source),
            Arc::new(embedder),
            ImageDecoder::new(LimitsConfig::default()),
            &config,
        )
    }

    fn reasons(report: &LoadReport) -> Vec<&'static str> {
        report.failures().map(|(_, r)| r.code()).collect()
    }

    #[tokio::test]
    async fn test_mixed_batch_tallies() {
        let source = FakeSource::new()
            .with("https://img/ada.jpg", png(1))
            .with("https://img/bob.jpg", png(2))
            .with("https://img/eve.jpg", b"not an image".to_vec());
        let embedder = FakeEmbedder::new().with(png(1), vec![1.0, 0.0]);
        let batch = vec![
            profile(json!({"publicIdentifier": "ada", "fullName": "Ada", "profilePic": "https://img/ada.jpg"})),
            profile(json!({"fullName": "No Id", "profilePic": "https://img/ada.jpg"})),
            profile(json!({"publicIdentifier": "norefs"})),
            profile(json!({"publicIdentifier": "gone", "profilePic": "https://img/404.jpg"})),
            profile(json!({"publicIdentifier": "bob", "profilePic": "https://img/bob.jpg"})),
            profile(json!({"publicIdentifier": "eve", "profilePic": "https://img/eve.jpg"})),
        ];

        let (gallery, report) = ingestor(source, embedder, IngestConfig::default())
            .build(&batch)
            .await;

        assert_eq!(report.total, 6);
        assert_eq!(report.computed, 1);
        assert_eq!(report.failed, 5);
        assert_eq!(
            reasons(&report),
            vec![
                "missing_identifier",
                "no_image_references",
                "download_failed",
                "no_face",
                "decode_failed"
            ]
        );
        assert_eq!(gallery.len(), 1);
        assert!(gallery.contains("ada"));
        let indices: Vec<usize> = report.outcomes.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_missing_identifier_does_no_work() {
        let source = FakeSource::new().with("https://img/a.jpg", png(1));
        let embedder = FakeEmbedder::new().with(png(1), vec![1.0]);
        let ingestor = ingestor(source, embedder, IngestConfig::default());
        let batch = vec![profile(json!({"profilePic": "https://img/a.jpg"}))];

        let (gallery, report) = ingestor.build(&batch).await;
        assert_eq!(report.failed, 1);
        assert!(gallery.is_empty());
    }

    #[tokio::test]
    async fn test_falls_back_to_later_reference() {
        let source = FakeSource::new().with("https://img/small.jpg", png(3));
        let embedder = FakeEmbedder::new().with(png(3), vec![0.5, 0.5]);
        let batch = vec![profile(json!({
            "publicIdentifier": "ada",
            "profilePicHighQuality": "https://img/expired.jpg",
            "profilePicAllDimensions": ["https://img/small.jpg"]
        }))];

        let (gallery, report) = ingestor(source, embedder, IngestConfig::default())
            .build(&batch)
            .await;
        assert_eq!(report.computed, 1);
        assert_eq!(gallery.get("ada").unwrap().embedding.as_slice(), &[0.5, 0.5]);
    }

    #[tokio::test]
    async fn test_embeds_leniently() {
        let embedder = Arc::new(FakeEmbedder::new().with(png(1), vec![1.0]));
        let ingestor = Ingestor::new(
            Arc::new(FakeSource::new().with("u", png(1))),
            embedder.clone(),
            ImageDecoder::new(LimitsConfig::default()),
            &IngestConfig::default(),
        );
        ingestor
            .build(&[profile(json!({"publicIdentifier": "a", "profilePic": "u"}))])
            .await;
        assert_eq!(*embedder.calls.lock().unwrap(), vec![Strictness::Lenient]);
    }

    #[tokio::test]
    async fn test_backend_error_is_recorded() {
        let source = FakeSource::new().with("u", png(1));
        let embedder = FakeEmbedder::new().with_error(
            png(1),
            EmbedError::Backend {
                message: "gpu fell over".into(),
                status_code: Some(500),
            },
        );
        let (_, report) = ingestor(source, embedder, IngestConfig::default())
            .build(&[profile(json!({"publicIdentifier": "a", "profilePic": "u"}))])
            .await;
        let (_, reason) = report.failures().next().unwrap();
        assert_eq!(reason.code(), "embedding_failed");
        assert!(reason.to_string().contains("gpu fell over"));
    }

    #[tokio::test]
    async fn test_duplicate_ids_last_write_wins() {
        let source = FakeSource::new().with("one", png(1)).with("two", png(2));
        let embedder = FakeEmbedder::new()
            .with(png(1), vec![1.0, 0.0])
            .with(png(2), vec![0.0, 1.0]);
        let batch = vec![
            profile(json!({"publicIdentifier": "ada", "fullName": "First", "profilePic": "one"})),
            profile(json!({"publicIdentifier": "ada", "fullName": "Second", "profilePic": "two"})),
        ];
        let (gallery, report) = ingestor(source, embedder, IngestConfig::default())
            .build(&batch)
            .await;
        assert_eq!(report.computed, 2);
        assert_eq!(gallery.len(), 1);
        let entry = gallery.get("ada").unwrap();
        assert_eq!(entry.embedding.as_slice(), &[0.0, 1.0]);
        assert_eq!(entry.profile.display_name(), Some("Second"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let source = FakeSource::new().with("one", png(1)).with("two", png(2));
        let embedder = FakeEmbedder::new()
            .with(png(1), vec![1.0, 0.0])
            .with(png(2), vec![1.0, 0.0, 0.0]);
        let batch = vec![
            profile(json!({"publicIdentifier": "a", "profilePic": "one"})),
            profile(json!({"publicIdentifier": "b", "profilePic": "two"})),
        ];
        let (gallery, report) = ingestor(source, embedder, IngestConfig::default())
            .build(&batch)
            .await;
        assert_eq!(gallery.len(), 1);
        assert_eq!(reasons(&report), vec!["dimension_mismatch"]);
    }

    #[tokio::test]
    async fn test_parallel_workers_preserve_order() {
        let mut source = FakeSource::new();
        let mut embedder = FakeEmbedder::new();
        let mut batch = Vec::new();
        for i in 0..20u8 {
            let url = format!("https://img/{i}.jpg");
            source = source.with(&url, png(i));
            embedder = embedder.with(png(i), vec![1.0, i as f32]);
            batch.push(profile(json!({"publicIdentifier": format!("p{i}"), "profilePic": url})));
        }
        let config = IngestConfig {
            parallel_workers: 8,
            ..IngestConfig::default()
        };
        let (gallery, report) = ingestor(source, embedder, config).build(&batch).await;
        assert_eq!(report.computed, 20);
        let ids: Vec<String> = gallery.iter().map(|e| e.id.clone()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("p{i}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_remaining_profiles() {
        let source = FakeSource::new()
            .with("u", png(1))
            .with_delay(Duration::from_secs(4));
        let embedder = FakeEmbedder::new().with(png(1), vec![1.0]);
        let config = IngestConfig {
            parallel_workers: 1,
            load_timeout_ms: 10_000,
        };
        let batch: Vec<Profile> = (0..5)
            .map(|i| profile(json!({"publicIdentifier": format!("p{i}"), "profilePic": "u"})))
            .collect();

        let source = Arc::new(source);
        let ingestor = Ingestor::new(
            source.clone(),
            Arc::new(embedder),
            ImageDecoder::new(LimitsConfig::default()),
            &config,
        );
        let (gallery, report) = ingestor.build(&batch).await;

        assert_eq!(report.total, 5);
        assert_eq!(report.computed, 2);
        assert_eq!(report.failed, 3);
        assert_eq!(gallery.len(), 2);
        assert!(reasons(&report).iter().all(|r| *r == "deadline_exceeded"));
        assert!(source.requests.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_non_object_records_fail_alone() {
        let source = FakeSource::new().with("u", png(1));
        let embedder = FakeEmbedder::new().with(png(1), vec![1.0, 0.0]);
        let records = vec![
            json!({"publicIdentifier": "ada", "profilePic": "u"}),
            serde_json::Value::Null,
            json!("bob"),
            json!({"publicIdentifier": 123, "fullName": "Numeric", "profilePic": "u"}),
        ];

        let (gallery, report) = ingestor(source, embedder, IngestConfig::default())
            .build_records(records)
            .await;

        assert_eq!((report.computed, report.failed, report.total), (2, 2, 4));
        assert_eq!(reasons(&report), vec!["invalid_record", "invalid_record"]);
        let failed: Vec<usize> = report.failures().map(|(o, _)| o.index).collect();
        assert_eq!(failed, vec![1, 2]);
        assert!(gallery.contains("ada"));
        assert!(gallery.contains("123"));
        assert_eq!(report.outcomes[3].profile_id.as_deref(), Some("123"));
    }

    #[test]
    fn test_failure_reason_serializes_as_code() {
        let json = serde_json::to_string(&FailureReason::DownloadFailed).unwrap();
        assert_eq!(json, "\"download_failed\"");
    }
}
