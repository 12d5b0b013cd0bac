//! Trakt OAuth: device-code login, token refresh and `traktAuth.json`

use super::client::TraktClient;
use super::TraktError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const TRAKT_AUTH_FILE: &str = "traktAuth.json";

/// Refresh this long before Trakt would reject the token.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraktToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub created_at: i64,
}

impl std::fmt::Debug for TraktToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraktToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl TraktToken {
    pub fn expires_at(&self) -> i64 {
        self.created_at + self.expires_in
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at() - EXPIRY_MARGIN_SECS
    }

    fn stamped(mut self, now: i64) -> Self {
        if self.created_at == 0 {
            self.created_at = now;
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCode {
    pub device_code: String,
    pub user_code: String,
    pub verification_url: String,
    pub expires_in: u64,
    pub interval: u64,
}

#[derive(Debug)]
pub(crate) enum PollOutcome {
    Token(TraktToken),
    Pending,
    SlowDown,
}

/// JSON token file in the working directory.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<TraktToken>, TraktError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(TraktError::TokenFile { path: self.path.clone(), source }),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| TraktError::TokenFormat { path: self.path.clone(), source })
    }

    pub fn save(&self, token: &TraktToken) -> Result<(), TraktError> {
        let json = serde_json::to_string_pretty(token)
            .map_err(|source| TraktError::TokenFormat { path: self.path.clone(), source })?;
        fs::write(&self.path, json).map_err(|source| TraktError::TokenFile { path: self.path.clone(), source })
    }
}

/// Run the device-code flow, calling `prompt` once with the code to show the user.
pub fn device_login(client: &TraktClient, prompt: impl FnOnce(&DeviceCode)) -> Result<TraktToken, TraktError> {
    let code = client.request_device_code()?;
    prompt(&code);

    let deadline = Instant::now() + Duration::from_secs(code.expires_in);
    let mut interval = code.interval;
    loop {
        match client.poll_device_token(&code.device_code)? {
            PollOutcome::Token(token) => return Ok(token),
            PollOutcome::Pending => tracing::debug!("Waiting for Trakt device authorization"),
            PollOutcome::SlowDown => {
                interval += 1;
                tracing::debug!("Trakt asked to slow down; polling every {interval}s");
            }
        }
        if Instant::now() >= deadline {
            return Err(TraktError::Auth("device code expired before authorization".to_string()));
        }
        std::thread::sleep(Duration::from_secs(interval));
    }
}

/// Return a usable token: stored, refreshed, or from a new device login.
pub fn authorize(client: &TraktClient, store: &TokenStore, now: i64) -> Result<TraktToken, TraktError> {
    if let Some(token) = store.load()? {
        if !token.is_expired(now) {
            tracing::debug!("Using stored Trakt token from {}", store.path().display());
            return Ok(token);
        }

        tracing::info!("Trakt token expired; refreshing");
        match client.refresh_token(&token.refresh_token) {
            Ok(refreshed) => {
                let refreshed = refreshed.stamped(now);
                store.save(&refreshed)?;
                tracing::info!("Trakt token refreshed and saved");
                return Ok(refreshed);
            }
            Err(TraktError::Api { status, message }) => {
                tracing::warn!("Trakt token refresh rejected (HTTP {status}): {message}");
            }
            Err(e) => return Err(e),
        }
    }

    let token = device_login(client, |code| {
        println!(
            "Enter the code \"{}\" at {} to authenticate your Trakt account",
            code.user_code, code.verification_url
        );
    })?
    .stamped(now);
    println!("Authentication successful!");
    store.save(&token)?;
    Ok(token)
}
