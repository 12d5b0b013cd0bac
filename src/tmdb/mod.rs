//! TMDB lookups (titles to TMDB ids)

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod client;
pub mod matcher;

pub use cache::{MediaKind, TmdbCache};
pub use client::TmdbClient;
pub use matcher::match_season_episodes;

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("TMDB setup error: {0}")]
    Setup(String),

    #[error("TMDB request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TMDB returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

/// The fields of a search hit worth keeping; also the cache record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbSearchResult {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl TmdbSearchResult {
    pub fn display_name(&self) -> &str {
        self.title.as_deref().or(self.name.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TmdbEpisode {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub episode_number: Option<u32>,
    #[serde(default)]
    pub season_number: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TmdbSeason {
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

/// What the importer needs from TMDB.
pub trait TmdbApi {
    fn search_tv(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError>;
    fn search_movie(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError>;
    /// Season listing; `language` of `None` means TMDB's default.
    fn season(&self, tv_id: u64, season_number: u32, language: Option<&str>) -> Result<TmdbSeason, TmdbError>;
}
