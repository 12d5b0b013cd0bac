//! Import command implementation

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};

use super::utils::{connect_trakt, load_settings, ConfigOpts};
use crate::import::{write_failed_items, ImportStats, Importer, NotFoundReport, NOT_FOUND_FILE, UNCATEGORIZED_FILE};
use crate::netflix::read_viewing_history;
use crate::tmdb::cache::TMDB_CACHE_FILE;
use crate::tmdb::{TmdbCache, TmdbClient};
use crate::trakt::{SyncReport, SyncTimings, TraktSync};

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Resolve everything but send nothing to Trakt (overrides [Trakt] dry_run)
    #[arg(long)]
    pub dry_run: bool,

    /// Viewing history CSV (default: [Netflix] viewing_history_filename)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Hide progress bars
    #[arg(long)]
    pub no_progress: bool,
}

pub fn run(args: ImportArgs, opts: &ConfigOpts, verbose: bool) -> Result<()> {
    let config = load_settings(opts, args.dry_run)?;
    crate::logging::init(&config.logging, verbose)?;

    let dry_run = args.dry_run || config.trakt.dry_run;
    let input = args.input.unwrap_or_else(|| PathBuf::from(&config.netflix.viewing_history_filename));

    let mut report = NotFoundReport::create(Path::new(NOT_FOUND_FILE))
        .with_context(|| format!("Failed to create {NOT_FOUND_FILE}"))?;

    let tmdb = TmdbClient::new(&config.tmdb)?;
    let mut cache = TmdbCache::open(TMDB_CACHE_FILE);

    let mut trakt = if dry_run {
        tracing::info!("Dry run enabled; Trakt will not be contacted");
        TraktSync::dry_run(config.trakt.page_size)
    } else {
        let client = connect_trakt(&config)?;
        let mut sync =
            TraktSync::new(Box::new(client), config.trakt.page_size, SyncTimings::from_config(&config.trakt));
        sync.cache_watched_history();
        sync
    };

    let mut history = read_viewing_history(&input, &config.netflix)?;
    println!(
        "Read {} shows ({} episodes) and {} movies from {}",
        history.shows.len(),
        history.episode_count(),
        history.movies.len(),
        input.display()
    );

    let show_progress = !args.no_progress && console::user_attended_stderr();
    let stats = Importer::new(&tmdb, &mut cache, &mut trakt, &mut report, &config.tmdb)
        .with_progress(show_progress)
        .run(&mut history)?;

    cache.log_summary();

    let movies = trakt.pending_movies().len();
    let episodes = trakt.pending_episodes().len();
    println!("Submitting {movies} movies and {episodes} episodes (total {} items) to Trakt ...", movies + episodes);
    let result = trakt.sync();

    for item in &result.not_found.movies {
        report.record(item.title.as_deref().unwrap_or("UNKNOWN_MOVIE"), None, None);
    }
    for item in &result.not_found.shows {
        report.record(item.title.as_deref().unwrap_or("UNKNOWN_SHOW"), None, None);
    }

    if !trakt.failed_items().is_empty() {
        let written = write_failed_items(Path::new(UNCATEGORIZED_FILE), trakt.failed_items())
            .with_context(|| format!("Failed to write {UNCATEGORIZED_FILE}"))?;
        println!();
        println!("{} titles not acknowledged by Trakt (see {UNCATEGORIZED_FILE}):", style(written).red().bold());
        for item in trakt.failed_items() {
            println!("  - {}", item.title());
        }
    }

    print_summary(&stats, &result, dry_run, report.recorded());
    Ok(())
}

fn print_summary(stats: &ImportStats, result: &SyncReport, dry_run: bool, not_found: usize) {
    println!();
    if dry_run {
        println!("{}", style("Dry run complete; nothing was sent to Trakt.").yellow().bold());
    } else {
        println!("{}", style("Trakt sync complete.").green().bold());
    }
    println!(
        "Added: {} movies, {} episodes.",
        result.added.movies, result.added.episodes
    );
    println!(
        "Skipped (already watched / duplicate): {} movies, {} episodes.",
        result.skipped_movies() + stats.movies_already_watched,
        result.skipped_episodes() + stats.episodes_already_watched
    );
    if result.failed_movies + result.failed_episodes > 0 {
        println!(
            "{} {} movies, {} episodes.",
            style("Failed:").red().bold(),
            result.failed_movies,
            result.failed_episodes
        );
    }
    println!();
    println!("Statistics:");
    println!("  Shows matched:     {}", stats.shows_found);
    println!("  Shows not found:   {}", stats.shows_not_found);
    println!("  Episodes matched:  {}", stats.episodes_matched);
    println!("  Episodes missed:   {}", stats.episodes_unmatched);
    println!("  Movies matched:    {}", stats.movies_found);
    println!("  Movies not found:  {}", stats.movies_not_found);
    if not_found > 0 {
        println!("  Not found entries: {not_found} (see {NOT_FOUND_FILE})");
    }
}
