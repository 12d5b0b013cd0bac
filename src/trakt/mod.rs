//! Trakt.tv: HTTP client, device authentication and batched history sync

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub mod auth;
pub mod client;
pub mod sync;

pub use auth::{authorize, TokenStore, TraktToken, TRAKT_AUTH_FILE};
pub use client::TraktClient;
pub use sync::{FailedItem, SyncReport, SyncTimings, TraktSync};

#[derive(Debug, Error)]
pub enum TraktError {
    #[error("Trakt setup error: {0}")]
    Setup(String),

    #[error("Trakt request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Trakt rate limit exceeded (HTTP 429)")]
    RateLimited,

    #[error("Trakt server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Trakt API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Trakt authentication failed: {0}")]
    Auth(String),

    #[error("Failed accessing token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid token file {path}: {source}")]
    TokenFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl TraktError {
    /// Whether resubmitting the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, TraktError::Http(_) | TraktError::RateLimited | TraktError::Server { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ids {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trakt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
}

impl Ids {
    pub fn tmdb(id: u64) -> Self {
        Self { trakt: None, tmdb: Some(id) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryMovie {
    pub title: String,
    pub watched_at: String,
    pub ids: Ids,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEpisode {
    pub watched_at: String,
    pub ids: Ids,
    /// `Show S01E02 Title`, for logs and reports only.
    #[serde(skip)]
    pub label: String,
}

/// Body of `POST /sync/history`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryPayload {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<HistoryMovie>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub episodes: Vec<HistoryEpisode>,
}

impl HistoryPayload {
    pub fn len(&self) -> usize {
        self.movies.len() + self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddedCounts {
    #[serde(default)]
    pub movies: u64,
    #[serde(default)]
    pub episodes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub ids: Ids,
}

impl NotFoundItem {
    pub fn describe(&self) -> String {
        match (&self.title, self.ids.tmdb) {
            (Some(title), _) => title.clone(),
            (None, Some(id)) => format!("tmdb:{id}"),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotFound {
    #[serde(default)]
    pub movies: Vec<NotFoundItem>,
    #[serde(default)]
    pub shows: Vec<NotFoundItem>,
    #[serde(default)]
    pub seasons: Vec<NotFoundItem>,
    #[serde(default)]
    pub episodes: Vec<NotFoundItem>,
}

impl NotFound {
    pub fn extend(&mut self, other: NotFound) {
        self.movies.extend(other.movies);
        self.shows.extend(other.shows);
        self.seasons.extend(other.seasons);
        self.episodes.extend(other.episodes);
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty() && self.shows.is_empty() && self.seasons.is_empty() && self.episodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub added: AddedCounts,
    #[serde(default)]
    pub not_found: NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaRef {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ids: Ids,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchedEpisode {
    pub number: u32,
    #[serde(default)]
    pub plays: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchedSeason {
    pub number: u32,
    #[serde(default)]
    pub episodes: Vec<WatchedEpisode>,
}

/// One entry of `GET /sync/watched/shows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchedShow {
    pub show: MediaRef,
    #[serde(default)]
    pub seasons: Vec<WatchedSeason>,
}

/// One entry of `GET /sync/watched/movies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchedMovie {
    pub movie: MediaRef,
}

pub trait TraktApi {
    fn watched_shows(&self) -> Result<Vec<WatchedShow>, TraktError>;
    fn watched_movies(&self) -> Result<Vec<WatchedMovie>, TraktError>;
    fn add_to_history(&self, payload: &HistoryPayload) -> Result<HistoryResponse, TraktError>;
}
