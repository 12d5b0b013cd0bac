//! Batched history upload with rate limiting and retries

use super::{
    AddedCounts, HistoryEpisode, HistoryMovie, HistoryPayload, HistoryResponse, NotFound, TraktApi, TraktError,
};
use crate::config::TraktConfig;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Sleep schedule for a sync run.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncTimings {
    /// Pause before the first request.
    pub initial_delay: Duration,
    /// Minimum gap between two batches.
    pub batch_delay: Duration,
    pub rate_limit_delay: Duration,
    pub server_error_delay: Duration,
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl SyncTimings {
    pub fn from_config(config: &TraktConfig) -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            batch_delay: config.batch_delay(),
            rate_limit_delay: Duration::from_secs(30),
            server_error_delay: Duration::from_secs(10),
            max_attempts: 5,
            backoff_min: Duration::from_secs(5),
            backoff_max: Duration::from_secs(60),
        }
    }

    /// Same retry budget, no sleeping.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            batch_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            server_error_delay: Duration::ZERO,
            max_attempts: 5,
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exp = Duration::from_secs(2u64.saturating_mul(1u64 << attempt.saturating_sub(1).min(16)));
        exp.clamp(self.backoff_min, self.backoff_max)
    }
}

/// A history entry that never reached Trakt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedItem {
    Movie(HistoryMovie),
    Episode(HistoryEpisode),
}

impl FailedItem {
    pub fn kind(&self) -> &'static str {
        match self {
            FailedItem::Movie(_) => "movie",
            FailedItem::Episode(_) => "episode",
        }
    }

    pub fn title(&self) -> &str {
        match self {
            FailedItem::Movie(m) => &m.title,
            FailedItem::Episode(e) => &e.label,
        }
    }

    pub fn watched_at(&self) -> &str {
        match self {
            FailedItem::Movie(m) => &m.watched_at,
            FailedItem::Episode(e) => &e.watched_at,
        }
    }

    pub fn tmdb_id(&self) -> Option<u64> {
        match self {
            FailedItem::Movie(m) => m.ids.tmdb,
            FailedItem::Episode(e) => e.ids.tmdb,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub submitted_movies: usize,
    pub submitted_episodes: usize,
    pub added: AddedCounts,
    pub not_found: NotFound,
    pub failed_movies: usize,
    pub failed_episodes: usize,
}

impl SyncReport {
    /// Accepted by Trakt but not added, usually because the play already exists.
    pub fn skipped_movies(&self) -> usize {
        self.submitted_movies.saturating_sub(self.added.movies as usize + self.failed_movies)
    }

    pub fn skipped_episodes(&self) -> usize {
        self.submitted_episodes.saturating_sub(self.added.episodes as usize + self.failed_episodes)
    }
}

pub struct TraktSync {
    api: Option<Box<dyn TraktApi>>,
    page_size: usize,
    timings: SyncTimings,
    movies: Vec<HistoryMovie>,
    episodes: Vec<HistoryEpisode>,
    watched_episodes: HashSet<(String, u32, u32)>,
    watched_movies: HashSet<u64>,
    failed: Vec<FailedItem>,
    last_call: Option<Instant>,
    consecutive_rate_limits: u32,
}

impl TraktSync {
    pub fn new(api: Box<dyn TraktApi>, page_size: usize, timings: SyncTimings) -> Self {
        Self::build(Some(api), page_size, timings)
    }

    /// Collects entries but never talks to Trakt.
    pub fn dry_run(page_size: usize) -> Self {
        Self::build(None, page_size, SyncTimings::immediate())
    }

    fn build(api: Option<Box<dyn TraktApi>>, page_size: usize, timings: SyncTimings) -> Self {
        Self {
            api,
            page_size: page_size.max(1),
            timings,
            movies: Vec::new(),
            episodes: Vec::new(),
            watched_episodes: HashSet::new(),
            watched_movies: HashSet::new(),
            failed: Vec::new(),
            last_call: None,
            consecutive_rate_limits: 0,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.api.is_none()
    }

    /// Load what the account has already watched. Failures leave both caches empty.
    pub fn cache_watched_history(&mut self) {
        let Some(api) = &self.api else {
            return;
        };
        self.watched_episodes.clear();
        self.watched_movies.clear();

        let fetched = api.watched_shows().and_then(|shows| Ok((shows, api.watched_movies()?)));
        let (shows, movies) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("Failed to cache watched history from Trakt: {e}");
                return;
            }
        };

        for watched in shows {
            let title = watched.show.title.to_lowercase();
            for season in watched.seasons {
                for episode in season.episodes {
                    self.watched_episodes.insert((title.clone(), season.number, episode.number));
                }
            }
        }
        self.watched_movies.extend(movies.into_iter().filter_map(|m| m.movie.ids.tmdb));

        tracing::info!(
            "Cached {} watched episodes and {} watched movies from Trakt",
            self.watched_episodes.len(),
            self.watched_movies.len()
        );
    }

    pub fn is_movie_watched(&self, tmdb_id: u64) -> bool {
        self.watched_movies.contains(&tmdb_id)
    }

    pub fn is_episode_watched(&self, show: &str, season: u32, episode: u32) -> bool {
        self.watched_episodes.contains(&(show.to_lowercase(), season, episode))
    }

    pub fn add_movie(&mut self, movie: HistoryMovie) {
        self.movies.push(movie);
    }

    pub fn add_episode(&mut self, episode: HistoryEpisode) {
        self.episodes.push(episode);
    }

    pub fn pending_movies(&self) -> &[HistoryMovie] {
        &self.movies
    }

    pub fn pending_episodes(&self) -> &[HistoryEpisode] {
        &self.episodes
    }

    pub fn failed_items(&self) -> &[FailedItem] {
        &self.failed
    }

    /// Upload every pending entry, movies first.
    pub fn sync(&mut self) -> SyncReport {
        let mut report = SyncReport {
            submitted_movies: self.movies.len(),
            submitted_episodes: self.episodes.len(),
            ..Default::default()
        };

        if self.api.is_none() {
            tracing::info!("Dry run enabled. Skipping actual Trakt sync.");
            report.added = AddedCounts { movies: self.movies.len() as u64, episodes: self.episodes.len() as u64 };
            return report;
        }
        if self.movies.is_empty() && self.episodes.is_empty() {
            tracing::info!("Nothing to sync to Trakt");
            return report;
        }

        tracing::info!("Adding initial delay before sync to prevent rate limiting...");
        std::thread::sleep(self.timings.initial_delay);

        let movie_batches: Vec<HistoryPayload> = self
            .movies
            .chunks(self.page_size)
            .map(|chunk| HistoryPayload { movies: chunk.to_vec(), episodes: Vec::new() })
            .collect();
        let episode_batches: Vec<HistoryPayload> = self
            .episodes
            .chunks(self.page_size)
            .map(|chunk| HistoryPayload { movies: Vec::new(), episodes: chunk.to_vec() })
            .collect();

        self.sync_batches(movie_batches, "movies", &mut report);
        if !self.movies.is_empty() && !self.episodes.is_empty() {
            tracing::info!("Waiting {:?} between movies and episodes sync...", self.timings.batch_delay);
            std::thread::sleep(self.timings.batch_delay);
        }
        self.sync_batches(episode_batches, "episodes", &mut report);

        tracing::info!(
            "Movies - Submitted: {}, Added: {}, Skipped (duplicates): {}, Failed (API errors): {}",
            report.submitted_movies,
            report.added.movies,
            report.skipped_movies(),
            report.failed_movies
        );
        tracing::info!(
            "Episodes - Submitted: {}, Added: {}, Skipped (duplicates): {}, Failed (API errors): {}",
            report.submitted_episodes,
            report.added.episodes,
            report.skipped_episodes(),
            report.failed_episodes
        );
        if report.failed_episodes > 0 {
            tracing::error!("{} episodes were lost due to persistent API failures", report.failed_episodes);
        }
        report
    }

    fn sync_batches(&mut self, batches: Vec<HistoryPayload>, kind: &str, report: &mut SyncReport) {
        let total = batches.len();
        if total > 0 {
            tracing::info!("Syncing {kind} in {total} batches of up to {}", self.page_size);
        }

        for (idx, batch) in batches.into_iter().enumerate() {
            let batch_num = idx + 1;
            self.throttle();

            match self.submit_with_retry(&batch, kind, batch_num) {
                Ok(response) => {
                    self.consecutive_rate_limits = 0;
                    tracing::info!(
                        "{kind} batch {batch_num}/{total}: added {} movies, {} episodes of {} items",
                        response.added.movies,
                        response.added.episodes,
                        batch.len()
                    );
                    report.added.movies += response.added.movies;
                    report.added.episodes += response.added.episodes;
                    report.not_found.extend(response.not_found);
                }
                Err(e) => {
                    tracing::error!("{kind} batch {batch_num} failed permanently after all retries: {e}");
                    report.failed_movies += batch.movies.len();
                    report.failed_episodes += batch.episodes.len();
                    self.failed.extend(batch.movies.into_iter().map(FailedItem::Movie));
                    self.failed.extend(batch.episodes.into_iter().map(FailedItem::Episode));
                }
            }
        }
    }

    /// Keep at least `batch_delay` between calls, longer after repeated 429s.
    fn throttle(&mut self) {
        let mut min_delay = self.timings.batch_delay;
        if self.consecutive_rate_limits > 0 {
            let extended = self
                .timings
                .rate_limit_delay
                .mul_f64(1.0 + f64::from(self.consecutive_rate_limits) * 0.5);
            min_delay = min_delay.max(extended);
            tracing::info!(
                "Using extended delay of {min_delay:?} due to {} recent rate limits",
                self.consecutive_rate_limits
            );
        }

        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < min_delay {
                tracing::debug!("Rate limiting: sleeping for {:?}", min_delay - elapsed);
                std::thread::sleep(min_delay - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }

    fn submit_with_retry(
        &mut self,
        batch: &HistoryPayload,
        kind: &str,
        batch_num: usize,
    ) -> Result<HistoryResponse, TraktError> {
        let Some(api) = &self.api else {
            return Ok(HistoryResponse::default());
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let err = match api.add_to_history(batch) {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            let pause = match &err {
                TraktError::RateLimited => {
                    self.consecutive_rate_limits += 1;
                    tracing::warn!(
                        "RATE LIMIT: 429 during {kind} batch {batch_num} (consecutive: {})",
                        self.consecutive_rate_limits
                    );
                    self.timings.rate_limit_delay
                }
                TraktError::Server { status } => {
                    tracing::warn!("SERVER ERROR: HTTP {status} during {kind} batch {batch_num}");
                    self.timings.server_error_delay
                }
                other => {
                    tracing::warn!("API ERROR: {kind} batch {batch_num}: {other}");
                    self.timings.batch_delay
                }
            };

            if attempt >= self.timings.max_attempts || !err.is_transient() {
                return Err(err);
            }
            let wait = pause + self.timings.backoff(attempt);
            tracing::warn!("Retrying {kind} batch {batch_num} in {wait:?} (attempt {attempt})");
            std::thread::sleep(wait);
        }
    }
}
