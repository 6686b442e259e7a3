//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem.
///
/// Output goes to stderr; stdout is reserved for command results. `RUST_LOG`
/// overrides `level` when set. HTTP request spans from `tower_http` are only
/// shown at debug level.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("{level},tower_http={}", tower_http_level(level)))
    });

    if json_format {
        // JSON format for machine parsing
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        // Pretty format for humans
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section.
///
/// CLI flags can only raise verbosity or switch to JSON, never the reverse.
pub fn init_from_config(
    config: &dex_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = if verbose_override && !matches!(config.logging.level.as_str(), "debug" | "trace")
    {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let json_format = json_logs_override || config.logging.format == "json";
    init(level, json_format);
}

fn tower_http_level(level: &str) -> &'static str {
    match level {
        "trace" => "trace",
        "debug" => "debug",
        _ => "warn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_spans_quiet_by_default() {
        assert_eq!(tower_http_level("info"), "warn");
        assert_eq!(tower_http_level("debug"), "debug");
    }
}
