//! Nearest-neighbour matching of a probe embedding against a gallery.
//!
//! Exhaustive scan: every stored embedding is scored by cosine distance,
//! the list is sorted ascending (stable, so ties keep gallery order), and
//! the best candidate is accepted only if its distance is strictly below
//! the configured threshold. The top-K list is returned either way so
//! callers can inspect near misses.

use serde::Serialize;
use std::time::Duration;

use crate::config::MatchingConfig;
use crate::embedding::Embedding;
use crate::math::cosine_distance;
use crate::profile::Profile;
use crate::store::Gallery;

/// One scored gallery entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub profile_id: String,
    pub name: Option<String>,
    pub distance: f32,
    pub confidence: f32,
}

/// The matcher's verdict for one probe.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchDecision {
    /// Best candidate is under the threshold.
    Matched {
        profile: Profile,
        best: MatchCandidate,
        top: Vec<MatchCandidate>,
    },
    /// Nothing close enough; `best_distance` is `None` only for an empty gallery.
    NoConfidentMatch {
        best_distance: Option<f32>,
        top: Vec<MatchCandidate>,
    },
}

/// Result of matching a probe image end to end.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A face was embedded and compared.
    Decided {
        decision: MatchDecision,
        elapsed: Duration,
    },
    /// The probe contained no confidently detected face.
    NoFace,
}

/// Scores probes against a gallery and applies the confidence threshold.
#[derive(Debug, Clone)]
pub struct Matcher {
    threshold: f32,
    top_k: usize,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}

impl Matcher {
    pub fn new(threshold: f32, top_k: usize) -> Self {
        Self { threshold, top_k }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.threshold, config.top_k)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score every entry and sort ascending by distance.
    pub fn rank(&self, probe: &Embedding, gallery: &Gallery) -> Vec<MatchCandidate> {
        let mut scored: Vec<MatchCandidate> = gallery
            .iter()
            .map(|entry| {
                let distance = cosine_distance(probe.as_slice(), entry.embedding.as_slice());
                MatchCandidate {
                    profile_id: entry.id.clone(),
                    name: entry.profile.display_name().map(String::from),
                    distance,
                    confidence: 1.0 - distance,
                }
            })
            .collect();
        // sort_by is stable: equal distances keep gallery order
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored
    }

    /// Rank, keep the top K, and decide whether the best one is a match.
    pub fn decide(&self, probe: &Embedding, gallery: &Gallery) -> MatchDecision {
        let mut top = self.rank(probe, gallery);
        top.truncate(self.top_k);

        let accepted = top
            .first()
            .filter(|best| best.distance < self.threshold)
            .cloned()
            .and_then(|best| {
                gallery
                    .get(&best.profile_id)
                    .map(|entry| (best, entry.profile.clone()))
            });

        match accepted {
            Some((best, profile)) => MatchDecision::Matched { profile, best, top },
            None => MatchDecision::NoConfidentMatch {
                best_distance: top.first().map(|c| c.distance),
                top,
            },
        }
    }
}
