//! In-memory viewing history

use super::classify::{classify_title, likely_episode, SeasonRef, TitleKind};
use super::dates::to_trakt_timestamp;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub name: String,
    pub number: Option<u32>,
    pub tmdb_id: Option<u64>,
    /// Trakt timestamps; the same day watched twice is one entry.
    pub watched_at: BTreeSet<String>,
}

impl Episode {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), number: None, tmdb_id: None, watched_at: BTreeSet::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub number: u32,
    pub name: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    fn episode_mut(&mut self, name: &str) -> &mut Episode {
        let idx = match self.episodes.iter().position(|e| e.name == name) {
            Some(idx) => idx,
            None => {
                self.episodes.push(Episode::new(name));
                self.episodes.len() - 1
            }
        };
        &mut self.episodes[idx]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TvShow {
    pub name: String,
    pub seasons: Vec<Season>,
}

impl TvShow {
    /// Find or create a season. Unnumbered seasons count as season 1.
    fn season_mut(&mut self, number: Option<u32>, name: Option<&str>) -> &mut Season {
        let effective = number.unwrap_or(1);
        let found = self
            .seasons
            .iter()
            .position(|s| s.number == effective)
            .or_else(|| name.and_then(|n| self.seasons.iter().position(|s| s.name.as_deref() == Some(n))));
        let idx = match found {
            Some(idx) => idx,
            None => {
                self.seasons.push(Season {
                    number: effective,
                    name: name.map(str::to_string),
                    episodes: Vec::new(),
                });
                self.seasons.len() - 1
            }
        };
        &mut self.seasons[idx]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movie {
    pub name: String,
    pub tmdb_id: Option<u64>,
    pub watched_at: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    /// Episodes with an explicit season in the title
    pub episodes_certain: usize,
    /// `Show: Title` rows classified as episodes
    pub episodes_inferred: usize,
    pub movies_certain: usize,
    pub ambiguous_resolved: usize,
}

#[derive(Debug, Clone)]
struct AmbiguousEntry {
    title: String,
    show: String,
    episode: String,
    date: String,
}

/// Shows and movies from one viewing-history export.
#[derive(Debug, Clone)]
pub struct NetflixHistory {
    pub shows: Vec<TvShow>,
    pub movies: Vec<Movie>,
    datetime_format: String,
    known_shows: HashSet<String>,
    ambiguous: Vec<AmbiguousEntry>,
    stats: ClassificationStats,
}

impl NetflixHistory {
    pub fn new(datetime_format: impl Into<String>) -> Self {
        Self {
            shows: Vec::new(),
            movies: Vec::new(),
            datetime_format: datetime_format.into(),
            known_shows: HashSet::new(),
            ambiguous: Vec::new(),
            stats: ClassificationStats::default(),
        }
    }

    pub fn stats(&self) -> &ClassificationStats {
        &self.stats
    }

    pub fn show(&self, name: &str) -> Option<&TvShow> {
        self.shows.iter().find(|s| s.name == name)
    }

    pub fn movie(&self, name: &str) -> Option<&Movie> {
        self.movies.iter().find(|m| m.name == name)
    }

    pub fn pending_ambiguous(&self) -> usize {
        self.ambiguous.len()
    }

    /// Classify one CSV row and record it.
    pub fn add_entry(&mut self, title: &str, date: &str) {
        match classify_title(title) {
            TitleKind::Episode { show, season, episode } => {
                let (number, name) = match &season {
                    SeasonRef::Number(n) => (Some(*n), None),
                    SeasonRef::Named(name) => (None, Some(name.as_str())),
                };
                self.add_episode(&show, number, name, &episode, date, false);
            }
            TitleKind::ShowAndTitle { show, title: episode } => {
                match likely_episode(&self.known_shows, &show, &episode) {
                    Some(true) => {
                        tracing::debug!("Episode classification: '{title}' is a TV episode");
                        self.add_episode(&show, Some(1), None, &episode, date, true);
                    }
                    Some(false) => {
                        tracing::debug!("Episode classification: '{title}' is a movie");
                        self.add_movie(title, date);
                    }
                    None => {
                        tracing::debug!("Episode classification: '{title}' kept for later resolution");
                        self.ambiguous.push(AmbiguousEntry {
                            title: title.to_string(),
                            show,
                            episode,
                            date: date.to_string(),
                        });
                    }
                }
            }
            TitleKind::Movie => {
                self.add_movie(title, date);
            }
        }
    }

    /// Record an episode view. Returns `false` when the date is unusable.
    pub fn add_episode(
        &mut self,
        show_name: &str,
        season_number: Option<u32>,
        season_name: Option<&str>,
        episode_name: &str,
        date: &str,
        inferred: bool,
    ) -> bool {
        let Some(watched_at) = self.timestamp(show_name, date) else {
            return false;
        };

        let idx = match self.shows.iter().position(|s| s.name == show_name) {
            Some(idx) => idx,
            None => {
                self.shows.push(TvShow { name: show_name.to_string(), seasons: Vec::new() });
                self.shows.len() - 1
            }
        };
        self.shows[idx]
            .season_mut(season_number, season_name)
            .episode_mut(episode_name)
            .watched_at
            .insert(watched_at);

        self.known_shows.insert(show_name.to_string());
        if inferred {
            self.stats.episodes_inferred += 1;
        } else {
            self.stats.episodes_certain += 1;
        }
        true
    }

    /// Record a movie view. Returns `false` when the date is unusable.
    pub fn add_movie(&mut self, title: &str, date: &str) -> bool {
        let Some(watched_at) = self.timestamp(title, date) else {
            return false;
        };
        match self.movies.iter_mut().find(|m| m.name == title) {
            Some(movie) => {
                movie.watched_at.insert(watched_at);
            }
            None => {
                self.movies.push(Movie {
                    name: title.to_string(),
                    tmdb_id: None,
                    watched_at: BTreeSet::from([watched_at]),
                });
            }
        }
        self.stats.movies_certain += 1;
        true
    }

    fn timestamp(&self, title: &str, date: &str) -> Option<String> {
        match to_trakt_timestamp(date, &self.datetime_format) {
            Ok(ts) => Some(ts),
            Err(e) => {
                tracing::warn!("Skipping '{title}': {e}");
                None
            }
        }
    }

    /// Settle `Show: Title` rows once every row has been seen.
    ///
    /// A show name that was confirmed elsewhere, or that appears in two or more
    /// undecided rows, makes the row an episode; otherwise it is a movie.
    pub fn resolve_ambiguous(&mut self) {
        let pending = std::mem::take(&mut self.ambiguous);
        let mut frequency: HashMap<&str, usize> = HashMap::new();
        for entry in &pending {
            *frequency.entry(entry.show.as_str()).or_default() += 1;
        }

        let mut resolved = 0usize;
        for entry in &pending {
            let known = self.known_shows.contains(&entry.show);
            if known || frequency[entry.show.as_str()] >= 2 {
                tracing::info!(
                    "Episode classification: resolving '{}' as episode ({})",
                    entry.title,
                    if known { "known show" } else { "multiple episodes" }
                );
                if self.add_episode(&entry.show, Some(1), None, &entry.episode, &entry.date, true) {
                    self.stats.ambiguous_resolved += 1;
                    resolved += 1;
                }
            } else {
                tracing::info!("Episode classification: resolving '{}' as movie", entry.title);
                self.add_movie(&entry.title, &entry.date);
            }
        }

        if resolved > 0 {
            tracing::info!("Episode classification: resolved {resolved} ambiguous entries as episodes");
        }
    }

    pub fn episode_count(&self) -> usize {
        self.shows.iter().flat_map(|s| &s.seasons).map(|s| s.episodes.len()).sum()
    }

    /// `{"tvshows": {show: [season...]}, "movies": {title: [timestamps]}}`
    pub fn to_json(&self) -> Value {
        let mut shows = Map::new();
        for show in &self.shows {
            let seasons: Vec<Value> = show
                .seasons
                .iter()
                .map(|season| {
                    let episodes: Map<String, Value> = season
                        .episodes
                        .iter()
                        .map(|e| (e.name.clone(), json!(e.watched_at)))
                        .collect();
                    json!({
                        "SeasonNumber": season.number,
                        "SeasonName": season.name,
                        "episodes": episodes,
                    })
                })
                .collect();
            shows.insert(show.name.clone(), Value::Array(seasons));
        }

        let movies: Map<String, Value> =
            self.movies.iter().map(|m| (m.name.clone(), json!(m.watched_at))).collect();

        json!({ "tvshows": shows, "movies": movies })
    }
}
