//! TMDB v3 HTTP client

use super::{TmdbApi, TmdbError, TmdbSearchResult, TmdbSeason};
use crate::config::TmdbConfig;
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const TMDB_API_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    language: String,
    debug: bool,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("debug", &self.debug)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<TmdbSearchResult>,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, TmdbError> {
        Self::with_base_url(config, TMDB_API_URL)
    }

    pub fn with_base_url(config: &TmdbConfig, base_url: &str) -> Result<Self, TmdbError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            TmdbError::Setup("[TMDB] api_key is not set; add it to config.ini".to_string())
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TmdbError::Setup(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            language: config.language.clone(),
            debug: config.debug,
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T, TmdbError> {
        if self.debug {
            tracing::info!("TMDB request: GET {path} {params:?}");
        }

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(&[("api_key", self.api_key.expose_secret())])
            .query(params)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TmdbError::Status { status: status.as_u16(), message });
        }
        Ok(response.json()?)
    }

    fn search(&self, kind: &str, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError> {
        let page: SearchPage = self.get(
            &format!("/search/{kind}"),
            &[("language", self.language.as_str()), ("query", query)],
        )?;
        Ok(page.results)
    }
}

impl TmdbApi for TmdbClient {
    fn search_tv(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError> {
        self.search("tv", query)
    }

    fn search_movie(&self, query: &str) -> Result<Vec<TmdbSearchResult>, TmdbError> {
        self.search("movie", query)
    }

    fn season(&self, tv_id: u64, season_number: u32, language: Option<&str>) -> Result<TmdbSeason, TmdbError> {
        let path = format!("/tv/{tv_id}/season/{season_number}");
        match language {
            Some(lang) => self.get(&path, &[("language", lang)]),
            None => self.get(&path, &[]),
        }
    }
}
