//! Parse command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::{load_settings, ConfigOpts};
use crate::netflix::read_viewing_history;

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Viewing history CSV (default: [Netflix] viewing_history_filename)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,
}

pub fn run(args: ParseArgs, opts: &ConfigOpts, verbose: bool) -> Result<()> {
    let config = load_settings(opts, false)?;
    crate::logging::init(&config.logging, verbose)?;

    let input = args.input.unwrap_or_else(|| PathBuf::from(&config.netflix.viewing_history_filename));
    let history = read_viewing_history(&input, &config.netflix)?;

    let stats = history.stats();
    tracing::info!(
        "Parsed {} shows ({} episodes) and {} movies; {} ambiguous titles resolved as episodes",
        history.shows.len(),
        history.episode_count(),
        history.movies.len(),
        stats.ambiguous_resolved
    );

    let json = serde_json::to_string_pretty(&history.to_json()).context("Failed to render history as JSON")?;
    println!("{json}");
    Ok(())
}
