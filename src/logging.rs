//! Log setup from the `[Logging]` section
//!
//! Logs go to the configured file. RUST_LOG in the environment always takes
//! precedence; `--verbose` raises the level to DEBUG.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.filename)
        .with_context(|| format!("Failed opening log file: {}", config.filename))?;

    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(config.level.level_filter().into())
    };

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(filter)
        .try_init();

    Ok(())
}

/// Stderr-only logging for commands that run before the config is known.
pub fn init_stderr(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .try_init();
}
