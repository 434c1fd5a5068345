//! # Logging
//!
//! Installs the global `tracing` subscriber: one JSON object per event on stdout.
use crate::cli::LogLevel;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Initializes logging at `level`.
///
/// `RUST_LOG` directives, when present, take precedence (e.g. `tower_http=debug`).
pub fn init(level: LogLevel) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level.into()).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install the logger: {e}"))
}
