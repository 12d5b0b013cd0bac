//! Trakt v2 HTTP client

use super::auth::{DeviceCode, PollOutcome, TraktToken};
use super::{HistoryPayload, HistoryResponse, TraktApi, TraktError, WatchedMovie, WatchedShow};
use crate::config::TraktConfig;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

pub const TRAKT_API_URL: &str = "https://api.trakt.tv";
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct TraktClient {
    http: Client,
    base_url: String,
    client_id: SecretString,
    client_secret: SecretString,
    redirect_uri: String,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for TraktClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraktClient")
            .field("base_url", &self.base_url)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &"[REDACTED]")
            .field("client_secret", &"[REDACTED]")
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

impl TraktClient {
    pub fn new(config: &TraktConfig) -> Result<Self, TraktError> {
        Self::with_base_url(config, TRAKT_API_URL)
    }

    pub fn with_base_url(config: &TraktConfig, base_url: &str) -> Result<Self, TraktError> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret) else {
            return Err(TraktError::Setup(format!(
                "[Trakt] {} not set; add your Trakt API application credentials to config.ini \
                 or enable dry_run",
                config.missing_credentials().join(" and ")
            )));
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TraktError::Setup(format!("Failed to create HTTP client: {e}")))?;

        let redirect_uri = if config.redirect_uri.trim().is_empty() {
            DEFAULT_REDIRECT_URI.to_string()
        } else {
            config.redirect_uri.trim().to_string()
        };

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            redirect_uri,
            access_token: None,
        })
    }

    pub fn set_token(&mut self, token: &TraktToken) {
        self.access_token = Some(SecretString::from(token.access_token.clone()));
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", self.client_id.expose_secret());
        match &self.access_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, TraktError> {
        let response = check_status(builder.send()?)?;
        Ok(response.json()?)
    }

    pub(crate) fn request_device_code(&self) -> Result<DeviceCode, TraktError> {
        let body = json!({ "client_id": self.client_id.expose_secret() });
        self.send(self.request(reqwest::Method::POST, "/oauth/device/code").json(&body))
    }

    pub(crate) fn poll_device_token(&self, device_code: &str) -> Result<PollOutcome, TraktError> {
        let body = json!({
            "code": device_code,
            "client_id": self.client_id.expose_secret(),
            "client_secret": self.client_secret.expose_secret(),
        });
        let response = self
            .request(reqwest::Method::POST, "/oauth/device/token")
            .json(&body)
            .send()?;

        match response.status().as_u16() {
            200 => Ok(PollOutcome::Token(response.json()?)),
            400 => Ok(PollOutcome::Pending),
            429 => Ok(PollOutcome::SlowDown),
            404 => Err(TraktError::Auth("invalid device code".to_string())),
            409 => Err(TraktError::Auth("device code already used".to_string())),
            410 => Err(TraktError::Auth("device code expired".to_string())),
            418 => Err(TraktError::Auth("access denied by user".to_string())),
            _ => check_status(response).map(|_| PollOutcome::Pending),
        }
    }

    pub(crate) fn refresh_token(&self, refresh_token: &str) -> Result<TraktToken, TraktError> {
        let body = json!({
            "refresh_token": refresh_token,
            "client_id": self.client_id.expose_secret(),
            "client_secret": self.client_secret.expose_secret(),
            "redirect_uri": self.redirect_uri,
            "grant_type": "refresh_token",
        });
        self.send(self.request(reqwest::Method::POST, "/oauth/token").json(&body))
    }
}

fn check_status(response: Response) -> Result<Response, TraktError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TraktError::RateLimited);
    }
    if status.is_server_error() {
        return Err(TraktError::Server { status: status.as_u16() });
    }
    let message = response.text().unwrap_or_else(|_| "Unknown error".to_string());
    Err(TraktError::Api { status: status.as_u16(), message })
}

impl TraktApi for TraktClient {
    fn watched_shows(&self) -> Result<Vec<WatchedShow>, TraktError> {
        self.send(self.request(reqwest::Method::GET, "/sync/watched/shows"))
    }

    fn watched_movies(&self) -> Result<Vec<WatchedMovie>, TraktError> {
        self.send(self.request(reqwest::Method::GET, "/sync/watched/movies"))
    }

    fn add_to_history(&self, payload: &HistoryPayload) -> Result<HistoryResponse, TraktError> {
        self.send(self.request(reqwest::Method::POST, "/sync/history").json(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trakt::{HistoryMovie, Ids};
    use mockito::Matcher;

    fn config() -> TraktConfig {
        TraktConfig {
            client_id: Some(SecretString::from("client-id".to_string())),
            client_secret: Some(SecretString::from("client-secret".to_string())),
            redirect_uri: String::new(),
            dry_run: false,
            page_size: 50,
            batch_delay_secs: 0.0,
        }
    }

    #[test]
    fn missing_credentials_are_a_setup_error() {
        let mut cfg = config();
        cfg.client_secret = None;
        let err = TraktClient::new(&cfg).unwrap_err();
        assert!(matches!(err, TraktError::Setup(ref m) if m.contains("secret")), "{err}");
    }

    #[test]
    fn empty_redirect_uses_out_of_band() {
        let client = TraktClient::new(&config()).unwrap();
        assert_eq!(client.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert!(!format!("{client:?}").contains("client-secret"));
    }

    #[test]
    fn sends_api_headers_and_bearer_token() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/sync/watched/movies")
            .match_header("trakt-api-version", "2")
            .match_header("trakt-api-key", "client-id")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"[{"plays":1,"movie":{"title":"Roma","year":2018,"ids":{"trakt":1,"tmdb":426426}}}]"#)
            .create();

        let mut client = TraktClient::with_base_url(&config(), &server.url()).unwrap();
        client.set_token(&TraktToken {
            access_token: "tok".into(),
            refresh_token: "ref".into(),
            ..Default::default()
        });
        let movies = client.watched_movies().unwrap();

        mock.assert();
        assert_eq!(movies[0].movie.ids.tmdb, Some(426426));
    }

    #[test]
    fn add_to_history_posts_payload() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/sync/history")
            .match_body(Matcher::PartialJson(json!({
                "movies": [{"title": "Roma", "watched_at": "2018-12-02T20:15:00.00Z", "ids": {"tmdb": 426426}}]
            })))
            .with_status(201)
            .with_body(r#"{"added":{"movies":1,"episodes":0},"not_found":{"movies":[],"shows":[],"seasons":[],"episodes":[]}}"#)
            .create();

        let client = TraktClient::with_base_url(&config(), &server.url()).unwrap();
        let payload = HistoryPayload {
            movies: vec![HistoryMovie {
                title: "Roma".into(),
                watched_at: "2018-12-02T20:15:00.00Z".into(),
                ids: Ids::tmdb(426426),
            }],
            episodes: Vec::new(),
        };
        let response = client.add_to_history(&payload).unwrap();

        mock.assert();
        assert_eq!(response.added.movies, 1);
    }

    #[test]
    fn classifies_error_statuses() {
        let mut server = mockito::Server::new();
        let client = TraktClient::with_base_url(&config(), &server.url()).unwrap();

        let _m = server.mock("GET", "/sync/watched/shows").with_status(429).create();
        assert!(matches!(client.watched_shows().unwrap_err(), TraktError::RateLimited));

        server.reset();
        let _m = server.mock("GET", "/sync/watched/shows").with_status(502).create();
        assert!(matches!(client.watched_shows().unwrap_err(), TraktError::Server { status: 502 }));

        server.reset();
        let _m = server.mock("GET", "/sync/watched/shows").with_status(401).with_body("nope").create();
        let err = client.watched_shows().unwrap_err();
        assert!(matches!(err, TraktError::Api { status: 401, .. }));
        assert!(!err.is_transient());
    }
}
