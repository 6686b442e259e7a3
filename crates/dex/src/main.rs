//! Dex CLI - face matching service for event check-in.
//!
//! Dex keeps a gallery of face embeddings for a batch of profiles and
//! identifies live camera captures against it over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Start the service
//! dex serve --port 5001
//!
//! # Upload profiles to a running service
//! dex load profiles.json --url http://localhost:5001
//!
//! # View configuration
//! dex config show
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod cli;
mod logging;
mod server;

/// Dex - face matching service for event check-in.
#[derive(Parser, Debug)]
#[command(name = "dex")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the platform default
    #[arg(short, long, global = true, env = "DEX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP face matching service
    Serve(cli::serve::ServeArgs),

    /// Upload a profile file to a running service
    Load(cli::load::LoadArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // `config init` and `config path` name a file that may not exist yet.
    let creating = matches!(
        &cli.command,
        Commands::Config(cli::config::ConfigArgs {
            command: cli::config::ConfigCommand::Init { .. } | cli::config::ConfigCommand::Path,
        })
    );
    let config = load_config(cli.config.as_deref(), creating)?;
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Dex v{}", dex_core::VERSION);

    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Load(args) => cli::load::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config).await,
    }
}

/// Resolve the effective configuration.
///
/// A `--config` path that does not exist is an error unless `allow_missing`
/// is set. A file that exists but fails to parse or validate falls back to
/// defaults with a warning.
fn load_config(path: Option<&Path>, allow_missing: bool) -> anyhow::Result<dex_core::Config> {
    let loaded = match path {
        Some(path) if path.exists() => dex_core::Config::load_from(path),
        Some(_) if allow_missing => Ok(dex_core::Config::default()),
        Some(path) => anyhow::bail!("Config file not found: {}", path.display()),
        None => dex_core::Config::load(),
    };

    // Logging isn't initialized yet, so config warnings go through eprintln.
    Ok(loaded.unwrap_or_else(|e| {
        eprintln!(
            "Warning: Failed to load config: {e}\n  \
             Using default configuration. Check your config file with `dex config check`."
        );
        dex_core::Config::default()
    }))
}
