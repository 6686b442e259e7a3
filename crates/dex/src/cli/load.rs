//! The `dex load` command: upload a profile file to a running service.

use anyhow::Context;
use clap::Args;
use dex_core::config::IngestConfig;
use dex_core::Config;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the `load` command.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// JSON file containing an array of profile records
    #[arg(required = true)]
    pub file: PathBuf,

    /// Base URL of the running service
    #[arg(long, env = "DEX_URL", default_value = "http://localhost:5001")]
    pub url: String,

    /// Request timeout in seconds [default: the server's load deadline plus a grace period]
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Extra time allowed on top of the server-side load deadline for the
/// response itself to arrive.
const RESPONSE_GRACE: Duration = Duration::from_secs(30);

/// How long to wait for `/load-profiles` to answer.
///
/// Without an explicit value the client outlives the server's own load
/// deadline, so it never gives up on a load the server will still apply.
fn request_timeout(explicit_secs: Option<u64>, ingest: &IngestConfig) -> Duration {
    match explicit_secs {
        Some(secs) => Duration::from_secs(secs),
        None => Duration::from_millis(ingest.load_timeout_ms) + RESPONSE_GRACE,
    }
}

#[derive(Debug, Deserialize)]
struct LoadSummary {
    computed: usize,
    failed: usize,
    total: usize,
    #[serde(default)]
    failures: Vec<Value>,
}

/// Execute the load command.
pub async fn execute(args: LoadArgs, config: &Config) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let profiles: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of profiles", args.file.display()))?;
    if profiles.is_empty() {
        anyhow::bail!("{} contains no profiles", args.file.display());
    }

    let endpoint = format!("{}/load-profiles", args.url.trim_end_matches('/'));
    tracing::info!("Uploading {} profiles to {}", profiles.len(), endpoint);

    let timeout = request_timeout(args.timeout, &config.ingest);
    if timeout < Duration::from_millis(config.ingest.load_timeout_ms) {
        tracing::warn!(
            "Timeout of {:?} is shorter than the load deadline of {}ms; the server may still apply this batch after the client gives up",
            timeout,
            config.ingest.load_timeout_ms
        );
    }
    let client = reqwest::Client::builder().timeout(timeout).build()?;

    let spinner = create_spinner(profiles.len());
    let result = client
        .post(&endpoint)
        .json(&serde_json::json!({ "profiles": profiles }))
        .send()
        .await;
    spinner.finish_and_clear();

    let response = result.with_context(|| format!("Failed to reach {endpoint}"))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Service answered {status}: {body}");
    }

    let summary: LoadSummary = response.json().await?;
    for failure in &summary.failures {
        tracing::warn!("Profile not loaded: {failure}");
    }
    println!(
        "Loaded profiles: {} computed, {} failed, {} total",
        summary.computed, summary.failed, summary.total
    );
    Ok(())
}

/// Create a spinner shown while the service computes embeddings.
fn create_spinner(count: usize) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("computing embeddings for {count} profiles..."));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeout_outlives_load_deadline() {
        let ingest = IngestConfig::default();
        let timeout = request_timeout(None, &ingest);
        assert!(timeout > Duration::from_millis(ingest.load_timeout_ms));

        let short = IngestConfig {
            load_timeout_ms: 1_000,
            ..IngestConfig::default()
        };
        assert_eq!(request_timeout(None, &short), Duration::from_secs(31));
    }

    #[test]
    fn test_explicit_timeout_wins() {
        let timeout = request_timeout(Some(45), &IngestConfig::default());
        assert_eq!(timeout, Duration::from_secs(45));
    }
}
