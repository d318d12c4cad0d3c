//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*};

use crate::config::{LogConfig, LogFormat};

const FALLBACK_FILTER: &str = "info";

/// Build the filter from `filter`, falling back to `info` when the
/// directive string does not parse.
pub fn env_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_new(filter).unwrap_or_else(|e| {
        eprintln!(
            "Ignoring invalid log filter '{}': {}. Using '{}'.",
            filter, e, FALLBACK_FILTER
        );
        EnvFilter::new(FALLBACK_FILTER)
    })
}

/// Install the global subscriber. Output goes to stderr so that commands
/// printing JSON keep stdout clean.
pub fn init_tracing(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = env_filter(&config.filter);
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    }
}
