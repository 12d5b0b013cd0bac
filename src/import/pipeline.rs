//! Resolve parsed history against TMDB and queue it for Trakt

use super::report::NotFoundReport;
use crate::config::TmdbConfig;
use crate::netflix::{Movie, NetflixHistory, TvShow};
use crate::tmdb::{match_season_episodes, MediaKind, TmdbApi, TmdbCache, TmdbError, TmdbSearchResult};
use crate::trakt::{HistoryEpisode, HistoryMovie, Ids, TraktSync};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("TMDB lookup for movie '{title}' failed: {source}")]
    MovieLookup {
        title: String,
        #[source]
        source: TmdbError,
    },
}

/// Retry policy for show searches.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRetry {
    pub attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for LookupRetry {
    fn default() -> Self {
        Self { attempts: 5, min_delay: Duration::from_secs(2), max_delay: Duration::from_secs(10) }
    }
}

impl LookupRetry {
    pub fn immediate() -> Self {
        Self { attempts: 5, min_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// Spread the waits across `[min_delay, max_delay]`.
    fn delay(&self, attempt: u32) -> Duration {
        let span = self.max_delay.saturating_sub(self.min_delay);
        let steps = self.attempts.max(1);
        self.min_delay + span.mul_f64(f64::from(attempt.min(steps)) / f64::from(steps))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub shows_found: usize,
    pub shows_not_found: usize,
    pub episodes_matched: usize,
    pub episodes_unmatched: usize,
    pub episodes_already_watched: usize,
    pub movies_found: usize,
    pub movies_not_found: usize,
    pub movies_already_watched: usize,
}

pub struct Importer<'a> {
    tmdb: &'a dyn TmdbApi,
    cache: &'a mut TmdbCache,
    trakt: &'a mut TraktSync,
    report: &'a mut NotFoundReport,
    season_language: Option<String>,
    strict: bool,
    retry: LookupRetry,
    show_progress: bool,
    stats: ImportStats,
}

impl<'a> Importer<'a> {
    pub fn new(
        tmdb: &'a dyn TmdbApi,
        cache: &'a mut TmdbCache,
        trakt: &'a mut TraktSync,
        report: &'a mut NotFoundReport,
        config: &TmdbConfig,
    ) -> Self {
        Self {
            tmdb,
            cache,
            trakt,
            report,
            season_language: config.episode_language_search.then(|| config.language.clone()),
            strict: config.strict,
            retry: LookupRetry::default(),
            show_progress: false,
            stats: ImportStats::default(),
        }
    }

    pub fn with_retry(mut self, retry: LookupRetry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Process every show, then every movie.
    pub fn run(mut self, history: &mut NetflixHistory) -> Result<ImportStats, ImportError> {
        let bar = progress_bar(history.shows.len(), "Finding and adding shows to Trakt..", self.show_progress);
        for show in &mut history.shows {
            self.import_show(show);
            bar.inc(1);
        }
        bar.finish_and_clear();

        let bar = progress_bar(history.movies.len(), "Finding and adding movies to Trakt..", self.show_progress);
        for movie in &mut history.movies {
            self.import_movie(movie)?;
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(self.stats)
    }

    pub fn import_show(&mut self, show: &mut TvShow) {
        if show.name.trim().is_empty() {
            return;
        }

        let found = match self.lookup_show(&show.name) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("TMDB query failed for show: {} ({e})", show.name);
                return;
            }
        };
        let Some(tmdb_show) = found.filter(|s| s.id != 0) else {
            tracing::warn!("Show {} not found on TMDB.", show.name);
            self.report.record(&show.name, None, None);
            self.stats.shows_not_found += 1;
            return;
        };
        self.stats.shows_found += 1;

        for season in &mut show.seasons {
            let listing = match self.tmdb.season(tmdb_show.id, season.number, self.season_language.as_deref()) {
                Ok(listing) => listing,
                Err(e) => {
                    tracing::error!("Error fetching season details for {} season {}: {e}", show.name, season.number);
                    continue;
                }
            };
            if listing.episodes.is_empty() {
                tracing::warn!("Could not retrieve episodes for {} season {}", show.name, season.number);
                continue;
            }

            let unmatched = match_season_episodes(season, &listing);
            self.stats.episodes_matched += season.episodes.len() - unmatched.len();
            self.stats.episodes_unmatched += unmatched.len();
            for name in unmatched {
                tracing::warn!("Could not find TMDB match for episode {} S{} '{name}'", show.name, season.number);
                self.report.record(&show.name, Some(season.number), Some(&name));
            }
        }

        self.queue_show(show);
    }

    pub fn import_movie(&mut self, movie: &mut Movie) -> Result<(), ImportError> {
        let found = match self.lookup(MediaKind::Movie, &movie.name) {
            Ok(found) => found,
            Err(source) if self.strict => {
                return Err(ImportError::MovieLookup { title: movie.name.clone(), source });
            }
            Err(e) => {
                tracing::info!("Ignoring exception while looking for movie {}: {e}", movie.name);
                return Ok(());
            }
        };

        match found {
            Some(hit) => {
                movie.tmdb_id = Some(hit.id);
                tracing::info!("Found movie {} : {} ({})", movie.name, hit.display_name(), hit.id);
                self.stats.movies_found += 1;
                self.queue_movie(movie);
            }
            None => {
                tracing::info!("Movie not found: {}", movie.name);
                self.report.record(&movie.name, None, None);
                self.stats.movies_not_found += 1;
            }
        }
        Ok(())
    }

    fn lookup(&mut self, kind: MediaKind, title: &str) -> Result<Option<TmdbSearchResult>, TmdbError> {
        if let Some(hit) = self.cache.get(kind, title) {
            return Ok(Some(hit));
        }
        let results = match kind {
            MediaKind::Tv => self.tmdb.search_tv(title)?,
            MediaKind::Movie => self.tmdb.search_movie(title)?,
        };
        tracing::debug!("Cache miss; queried TMDB for: {title}");
        let first = results.into_iter().next();
        if let Some(hit) = &first {
            self.cache.insert(kind, title, hit.clone());
        }
        Ok(first)
    }

    fn lookup_show(&mut self, name: &str) -> Result<Option<TmdbSearchResult>, TmdbError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.lookup(MediaKind::Tv, name) {
                Ok(found) => return Ok(found),
                Err(e) if attempt < self.retry.attempts => {
                    let wait = self.retry.delay(attempt);
                    tracing::debug!("Show lookup for {name} failed ({e}); retrying in {wait:?}");
                    std::thread::sleep(wait);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn queue_show(&mut self, show: &TvShow) {
        for season in &show.seasons {
            tracing::info!(
                "Adding episodes to trakt: {} episodes from {} season {}",
                season.episodes.len(),
                show.name,
                season.number
            );
            for episode in &season.episodes {
                let Some(tmdb_id) = episode.tmdb_id else {
                    continue;
                };
                if let Some(number) = episode.number {
                    if self.trakt.is_episode_watched(&show.name, season.number, number) {
                        tracing::debug!("Skipping already-watched episode: {} S{}E{number}", show.name, season.number);
                        self.stats.episodes_already_watched += 1;
                        continue;
                    }
                }
                let label = match episode.number {
                    Some(n) => format!("{} S{:02}E{n:02} {}", show.name, season.number, episode.name),
                    None => format!("{} S{:02} {}", show.name, season.number, episode.name),
                };
                for watched_at in &episode.watched_at {
                    self.trakt.add_episode(HistoryEpisode {
                        watched_at: watched_at.clone(),
                        ids: Ids::tmdb(tmdb_id),
                        label: label.clone(),
                    });
                }
            }
        }
    }

    fn queue_movie(&mut self, movie: &Movie) {
        let Some(tmdb_id) = movie.tmdb_id else {
            return;
        };
        if self.trakt.is_movie_watched(tmdb_id) {
            tracing::debug!("Skipping already-watched movie: {}", movie.name);
            self.stats.movies_already_watched += 1;
            return;
        }
        for watched_at in &movie.watched_at {
            tracing::info!("Adding movie to trakt: {}", movie.name);
            self.trakt.add_movie(HistoryMovie {
                title: movie.name.clone(),
                watched_at: watched_at.clone(),
                ids: Ids::tmdb(tmdb_id),
            });
        }
    }
}

fn progress_bar(len: usize, message: &'static str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template("{msg} {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(len as u64).with_style(style).with_message(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tmdb::{TmdbEpisode, TmdbSeason};
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeTmdb {
        show_failures: Cell<u32>,
        movie_error: bool,
        seasons_requested: RefCell<Vec<(u64, u32, Option<String>)>>,
        searches: Cell<u32>,
    }

    impl TmdbApi for FakeTmdb {
        fn search_tv(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError> {
            self.searches.set(self.searches.get() + 1);
            if self.show_failures.get() > 0 {
                self.show_failures.set(self.show_failures.get() - 1);
                return Err(TmdbError::Status { status: 503, message: "busy".into() });
            }
            Ok(match query {
                "Dark" => vec![TmdbSearchResult { id: 70523, name: Some("Dark".into()), ..Default::default() }],
                _ => Vec::new(),
            })
        }

        fn search_movie(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError> {
            self.searches.set(self.searches.get() + 1);
            if self.movie_error {
                return Err(TmdbError::Status { status: 500, message: "down".into() });
            }
            Ok(match query {
                "Roma" => vec![TmdbSearchResult { id: 426426, title: Some("Roma".into()), ..Default::default() }],
                _ => Vec::new(),
            })
        }

        fn season(&self, tv_id: u64, season_number: u32, language: Option<&str>) -> Result<TmdbSeason, TmdbError> {
            self.seasons_requested.borrow_mut().push((tv_id, season_number, language.map(str::to_string)));
            Ok(TmdbSeason {
                season_number: Some(season_number),
                episodes: vec![
                    TmdbEpisode { id: 101, name: "Secrets".into(), episode_number: Some(1), season_number: Some(1) },
                    TmdbEpisode { id: 102, name: "Lies".into(), episode_number: Some(2), season_number: Some(1) },
                ],
            })
        }
    }

    fn tmdb_config(strict: bool, episode_language_search: bool) -> TmdbConfig {
        TmdbConfig {
            api_key: None,
            language: "de".into(),
            debug: false,
            strict,
            episode_language_search,
        }
    }

    fn history() -> NetflixHistory {
        let mut h = NetflixHistory::new("%d.%m.%y");
        h.add_entry("Dark: Season 1: Secrets", "01.12.17");
        h.add_entry("Dark: Season 1: Secrets", "05.12.17");
        h.add_entry("Dark: Season 1: Unknown Episode", "02.12.17");
        h.add_entry("Nonexistent Show: Season 1: Pilot", "03.12.17");
        h.add_entry("Roma", "02.12.18");
        h.add_entry("Obscure Film", "03.12.18");
        h
    }

    struct Fixture {
        _tmp: TempDir,
        report_path: std::path::PathBuf,
        cache: TmdbCache,
        trakt: TraktSync,
        report: NotFoundReport,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().expect("tmp");
        let report_path = tmp.path().join("not_found.csv");
        let report = NotFoundReport::create(&report_path).expect("report");
        Fixture { _tmp: tmp, report_path, cache: TmdbCache::in_memory(), trakt: TraktSync::dry_run(50), report }
    }

    #[test]
    fn queues_matches_and_reports_misses() {
        let tmdb = FakeTmdb::default();
        let mut fx = fixture();
        let mut h = history();

        let stats = Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, false))
            .with_retry(LookupRetry::immediate())
            .run(&mut h)
            .expect("import");

        assert_eq!(stats.shows_found, 1);
        assert_eq!(stats.shows_not_found, 1);
        assert_eq!(stats.episodes_matched, 1);
        assert_eq!(stats.episodes_unmatched, 1);
        assert_eq!(stats.movies_found, 1);
        assert_eq!(stats.movies_not_found, 1);

        let episodes = fx.trakt.pending_episodes();
        assert_eq!(episodes.len(), 2, "one entry per watch date");
        assert!(episodes.iter().all(|e| e.ids.tmdb == Some(101)));
        assert_eq!(episodes[0].label, "Dark S01E01 Secrets");
        assert_eq!(fx.trakt.pending_movies()[0].ids.tmdb, Some(426426));

        let report = fs::read_to_string(&fx.report_path).expect("read");
        assert!(report.contains("Dark,1,Unknown Episode"));
        assert!(report.contains("Nonexistent Show,,"));
        assert!(report.contains("Obscure Film,,"));
    }

    #[test]
    fn season_language_follows_episode_language_search() {
        let tmdb = FakeTmdb::default();
        let mut fx = fixture();
        let mut h = history();
        Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, true))
            .with_retry(LookupRetry::immediate())
            .run(&mut h)
            .expect("import");
        assert_eq!(tmdb.seasons_requested.borrow()[0], (70523, 1, Some("de".to_string())));

        let tmdb = FakeTmdb::default();
        let mut fx = fixture();
        let mut h = history();
        Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, false))
            .with_retry(LookupRetry::immediate())
            .run(&mut h)
            .expect("import");
        assert_eq!(tmdb.seasons_requested.borrow()[0].2, None);
    }

    #[test]
    fn strict_movie_errors_abort() {
        let tmdb = FakeTmdb { movie_error: true, ..Default::default() };
        let mut fx = fixture();
        let mut h = history();
        let err = Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, false))
            .with_retry(LookupRetry::immediate())
            .run(&mut h)
            .unwrap_err();
        assert!(err.to_string().contains("Roma"));
    }

    #[test]
    fn lenient_movie_errors_are_skipped() {
        let tmdb = FakeTmdb { movie_error: true, ..Default::default() };
        let mut fx = fixture();
        let mut h = history();
        let stats = Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(false, false))
            .with_retry(LookupRetry::immediate())
            .run(&mut h)
            .expect("import");
        assert_eq!(stats.movies_found, 0);
        assert!(fx.trakt.pending_movies().is_empty());
    }

    #[test]
    fn show_search_is_retried() {
        let tmdb = FakeTmdb { show_failures: Cell::new(4), ..Default::default() };
        let mut fx = fixture();
        let mut show = TvShow { name: "Dark".into(), seasons: Vec::new() };
        let mut importer = Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, false))
            .with_retry(LookupRetry::immediate());
        importer.import_show(&mut show);
        assert_eq!(importer.stats.shows_found, 1);
        assert_eq!(tmdb.searches.get(), 5);
    }

    #[test]
    fn cached_results_skip_search() {
        let tmdb = FakeTmdb::default();
        let mut fx = fixture();
        fx.cache.insert(
            MediaKind::Movie,
            "Obscure Film",
            TmdbSearchResult { id: 9, title: Some("Obscure Film".into()), ..Default::default() },
        );
        let mut movie = Movie { name: "obscure film".into(), tmdb_id: None, watched_at: Default::default() };
        let mut importer = Importer::new(&tmdb, &mut fx.cache, &mut fx.trakt, &mut fx.report, &tmdb_config(true, false));
        importer.import_movie(&mut movie).expect("import");
        assert_eq!(movie.tmdb_id, Some(9));
        assert_eq!(tmdb.searches.get(), 0);
    }

    #[test]
    fn retry_delays_stay_in_range() {
        let retry = LookupRetry::default();
        assert!(retry.delay(1) >= Duration::from_secs(2));
        assert!(retry.delay(5) <= Duration::from_secs(10));
    }
}
