//! Logging initialization.
//!
//! Each run writes to a fresh log file; the level comes from the verbosity
//! flags but can be overridden through the standard `RUST_LOG` environment
//! filter.

use std::fs::File;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Initializes the tracing subscriber writing to `logfile` at `level`.
///
/// The log file is truncated at the start of every run.
pub fn init_logging(logfile: &str, level: &str) -> Result<()> {
    let file = File::create(logfile)
        .with_context(|| format!("Failed to create log file: {logfile}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();
    Ok(())
}
