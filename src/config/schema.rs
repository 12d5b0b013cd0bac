//! Typed configuration sections
//!
//! [`ResolvedConfig`] is built once from the merged INI layers and then only
//! read. Secrets are `Option<SecretString>`: the `None` sentinel in the file
//! maps to `Option::None`, never to the text "None".

use super::error::ConfigValidationError;
use super::ini::{escape, interpolate, render, Sections};
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

pub const LOGGING_SECTION: &str = "Logging";
pub const NETFLIX_SECTION: &str = "Netflix";
pub const TMDB_SECTION: &str = "TMDB";
pub const TRAKT_SECTION: &str = "Trakt";

/// Text used in the file for an unset secret.
pub const SECRET_SENTINEL: &str = "None";

const REDACTED: &str = "<redacted>";
const DEFAULT_BATCH_DELAY_SECS: f64 = 3.0;

/// Options recognized per section. Anything else is passed through or rejected.
pub const KNOWN_KEYS: &[(&str, &[&str])] = &[
    (LOGGING_SECTION, &["filename", "level"]),
    (
        NETFLIX_SECTION,
        &["viewing_history_filename", "viewing_history_datetime_format", "viewing_history_delimiter"],
    ),
    (TMDB_SECTION, &["api_key", "language", "debug", "strict", "episode_language_search"]),
    (TRAKT_SECTION, &["id", "secret", "trakt_redirect_uri", "dry_run", "page_size", "batch_delay"]),
];

pub fn known_keys(section: &str) -> Option<&'static [&'static str]> {
    KNOWN_KEYS.iter().find(|(name, _)| *name == section).map(|(_, keys)| *keys)
}

/// Python-style logging level names accepted by `[Logging] level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
    NotSet,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::NotSet,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::NotSet => "NOTSET",
        }
    }

    /// tracing has no CRITICAL, and NOTSET means "log everything".
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Critical | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::NotSet => LevelFilter::TRACE,
        }
    }

    fn accepted() -> String {
        Self::ALL.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl FromStr for LogLevel {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|level| level.as_str() == s).ok_or_else(|| {
            ConfigValidationError::InvalidLevel { value: s.to_string(), accepted: Self::accepted() }
        })
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub filename: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetflixConfig {
    pub viewing_history_filename: String,
    /// Already unescaped: `%d.%m.%y`, not `%%d.%%m.%%y`.
    pub viewing_history_datetime_format: String,
    pub viewing_history_delimiter: char,
}

#[derive(Debug, Clone)]
pub struct TmdbConfig {
    pub api_key: Option<SecretString>,
    pub language: String,
    pub debug: bool,
    pub strict: bool,
    pub episode_language_search: bool,
}

#[derive(Debug, Clone)]
pub struct TraktConfig {
    pub client_id: Option<SecretString>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub dry_run: bool,
    pub page_size: usize,
    pub batch_delay_secs: f64,
}

impl TraktConfig {
    /// Falls back to the default when `batch_delay_secs` was set out of range after loading.
    pub fn batch_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.batch_delay_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_BATCH_DELAY_SECS))
    }

    /// Names of the credentials that are not set, in file order.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("id");
        }
        if self.client_secret.is_none() {
            missing.push("secret");
        }
        missing
    }
}

fn same_secret(a: &Option<SecretString>, b: &Option<SecretString>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        _ => false,
    }
}

impl PartialEq for TmdbConfig {
    fn eq(&self, other: &Self) -> bool {
        same_secret(&self.api_key, &other.api_key)
            && self.language == other.language
            && self.debug == other.debug
            && self.strict == other.strict
            && self.episode_language_search == other.episode_language_search
    }
}

impl PartialEq for TraktConfig {
    fn eq(&self, other: &Self) -> bool {
        same_secret(&self.client_id, &other.client_id)
            && same_secret(&self.client_secret, &other.client_secret)
            && self.redirect_uri == other.redirect_uri
            && self.dry_run == other.dry_run
            && self.page_size == other.page_size
            && self.batch_delay_secs == other.batch_delay_secs
    }
}

/// Fully merged, typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub logging: LoggingConfig,
    pub netflix: NetflixConfig,
    pub tmdb: TmdbConfig,
    pub trakt: TraktConfig,
    /// Options outside the schema, kept verbatim (raw, still escaped).
    pub extra: Sections,
}

impl ResolvedConfig {
    /// Coerce merged raw sections into typed configuration.
    pub fn from_sections(merged: &Sections) -> Result<Self, ConfigValidationError> {
        let logging = SectionReader::new(LOGGING_SECTION, merged);
        let netflix = SectionReader::new(NETFLIX_SECTION, merged);
        let tmdb = SectionReader::new(TMDB_SECTION, merged);
        let trakt = SectionReader::new(TRAKT_SECTION, merged);

        let level_text = logging.string("level")?;

        Ok(Self {
            logging: LoggingConfig {
                filename: logging.non_empty("filename")?,
                level: level_text.parse()?,
            },
            netflix: NetflixConfig {
                viewing_history_filename: netflix.non_empty("viewing_history_filename")?,
                viewing_history_datetime_format: netflix
                    .non_empty("viewing_history_datetime_format")?,
                viewing_history_delimiter: netflix.single_char("viewing_history_delimiter")?,
            },
            tmdb: TmdbConfig {
                api_key: tmdb.secret("api_key")?,
                language: tmdb.non_empty("language")?,
                debug: tmdb.boolean("debug")?,
                strict: tmdb.boolean("strict")?,
                episode_language_search: tmdb.boolean("episode_language_search")?,
            },
            trakt: TraktConfig {
                client_id: trakt.secret("id")?,
                client_secret: trakt.secret("secret")?,
                redirect_uri: trakt.string("trakt_redirect_uri")?,
                dry_run: trakt.boolean("dry_run")?,
                page_size: trakt.positive_int("page_size")?,
                batch_delay_secs: trakt.seconds_or("batch_delay", DEFAULT_BATCH_DELAY_SECS)?,
            },
            extra: collect_extra(merged),
        })
    }

    /// Canonical INI text that loads back into an identical config.
    pub fn to_ini(&self) -> String {
        self.render_with(|secret| match secret {
            Some(value) => escape(value.expose_secret()),
            None => SECRET_SENTINEL.to_string(),
        })
    }

    /// Like [`Self::to_ini`], but set secrets are replaced by a marker.
    pub fn to_redacted_ini(&self) -> String {
        self.render_with(|secret| match secret {
            Some(_) => REDACTED.to_string(),
            None => SECRET_SENTINEL.to_string(),
        })
    }

    fn render_with(&self, secret: impl Fn(&Option<SecretString>) -> String) -> String {
        let flag = |b: bool| if b { "True" } else { "False" }.to_string();
        let kv = |k: &str, v: String| (k.to_string(), v);

        let mut logging = vec![
            kv("filename", escape(&self.logging.filename)),
            kv("level", self.logging.level.as_str().to_string()),
        ];
        let mut netflix = vec![
            kv("viewing_history_filename", escape(&self.netflix.viewing_history_filename)),
            kv(
                "viewing_history_datetime_format",
                escape(&self.netflix.viewing_history_datetime_format),
            ),
            kv(
                "viewing_history_delimiter",
                escape(&self.netflix.viewing_history_delimiter.to_string()),
            ),
        ];
        let mut tmdb = vec![
            kv("api_key", secret(&self.tmdb.api_key)),
            kv("language", escape(&self.tmdb.language)),
            kv("debug", flag(self.tmdb.debug)),
            kv("strict", flag(self.tmdb.strict)),
            kv("episode_language_search", flag(self.tmdb.episode_language_search)),
        ];
        let mut trakt = vec![
            kv("id", secret(&self.trakt.client_id)),
            kv("secret", secret(&self.trakt.client_secret)),
            kv("trakt_redirect_uri", escape(&self.trakt.redirect_uri)),
            kv("dry_run", flag(self.trakt.dry_run)),
            kv("page_size", self.trakt.page_size.to_string()),
            kv("batch_delay", self.trakt.batch_delay_secs.to_string()),
        ];

        for (section, entries) in [
            (LOGGING_SECTION, &mut logging),
            (NETFLIX_SECTION, &mut netflix),
            (TMDB_SECTION, &mut tmdb),
            (TRAKT_SECTION, &mut trakt),
        ] {
            if let Some(extra) = self.extra.get(section) {
                entries.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        let mut sections: Vec<(&str, Vec<(String, String)>)> = vec![
            (LOGGING_SECTION, logging),
            (NETFLIX_SECTION, netflix),
            (TMDB_SECTION, tmdb),
            (TRAKT_SECTION, trakt),
        ];
        for (name, entries) in &self.extra {
            if known_keys(name).is_none() {
                sections.push((name.as_str(), entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect()));
            }
        }

        render(&sections)
    }
}

fn collect_extra(merged: &Sections) -> Sections {
    let mut extra = Sections::new();
    for (section, entries) in merged {
        match known_keys(section) {
            None => {
                extra.insert(section.clone(), entries.clone());
            }
            Some(keys) => {
                let unknown: BTreeMap<String, String> = entries
                    .iter()
                    .filter(|(k, _)| !keys.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                if !unknown.is_empty() {
                    extra.insert(section.clone(), unknown);
                }
            }
        }
    }
    extra
}

/// Typed, interpolating accessors over one merged section.
struct SectionReader<'a> {
    name: &'static str,
    entries: Option<&'a BTreeMap<String, String>>,
}

impl<'a> SectionReader<'a> {
    fn new(name: &'static str, merged: &'a Sections) -> Self {
        Self { name, entries: merged.get(name) }
    }

    fn raw(&self, key: &str) -> Option<&'a String> {
        self.entries.and_then(|entries| entries.get(key))
    }

    fn string(&self, key: &str) -> Result<String, ConfigValidationError> {
        let raw = self.raw(key).ok_or_else(|| ConfigValidationError::MissingKey {
            section: self.name.to_string(),
            key: key.to_string(),
        })?;
        match self.entries {
            Some(entries) => interpolate(self.name, entries, key, raw),
            None => Ok(raw.clone()),
        }
    }

    fn non_empty(&self, key: &str) -> Result<String, ConfigValidationError> {
        let value = self.string(key)?;
        if value.is_empty() {
            return Err(ConfigValidationError::EmptyValue {
                section: self.name.to_string(),
                key: key.to_string(),
            });
        }
        Ok(value)
    }

    fn boolean(&self, key: &str) -> Result<bool, ConfigValidationError> {
        let value = self.string(key)?;
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ConfigValidationError::InvalidBool {
                section: self.name.to_string(),
                key: key.to_string(),
                value,
            }),
        }
    }

    fn positive_int(&self, key: &str) -> Result<usize, ConfigValidationError> {
        let value = self.string(key)?;
        let invalid = || ConfigValidationError::InvalidInteger {
            section: self.name.to_string(),
            key: key.to_string(),
            value: value.clone(),
        };
        let parsed: i64 = value.parse().map_err(|_| invalid())?;
        if parsed <= 0 {
            return Err(ConfigValidationError::NonPositiveInteger {
                section: self.name.to_string(),
                key: key.to_string(),
                value: parsed,
            });
        }
        usize::try_from(parsed).map_err(|_| invalid())
    }

    fn seconds_or(&self, key: &str, default: f64) -> Result<f64, ConfigValidationError> {
        if self.raw(key).is_none() {
            return Ok(default);
        }
        let value = self.string(key)?;
        match value.parse::<f64>() {
            Ok(secs) if secs >= 0.0 && Duration::try_from_secs_f64(secs).is_ok() => Ok(secs),
            _ => Err(ConfigValidationError::InvalidNumber {
                section: self.name.to_string(),
                key: key.to_string(),
                value,
            }),
        }
    }

    fn single_char(&self, key: &str) -> Result<char, ConfigValidationError> {
        let value = self.string(key)?;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConfigValidationError::InvalidDelimiter {
                section: self.name.to_string(),
                key: key.to_string(),
                value,
            }),
        }
    }

    fn secret(&self, key: &str) -> Result<Option<SecretString>, ConfigValidationError> {
        let value = self.string(key)?;
        if value.is_empty() || value == SECRET_SENTINEL {
            return Ok(None);
        }
        Ok(Some(SecretString::from(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_accepts_exactly_the_six_names() {
        for name in ["CRITICAL", "ERROR", "WARNING", "INFO", "DEBUG", "NOTSET"] {
            let level: LogLevel = name.parse().expect("known level");
            assert_eq!(level.as_str(), name);
        }
        for bad in ["info", "Warning", "WARN", "TRACE", ""] {
            assert!(bad.parse::<LogLevel>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn invalid_level_lists_accepted_values() {
        let err = "VERBOSE".parse::<LogLevel>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("VERBOSE"));
        assert!(msg.contains("CRITICAL, ERROR, WARNING, INFO, DEBUG, NOTSET"), "got: {msg}");
    }

    #[test]
    fn notset_logs_everything() {
        assert_eq!(LogLevel::NotSet.level_filter(), LevelFilter::TRACE);
        assert_eq!(LogLevel::Critical.level_filter(), LevelFilter::ERROR);
    }

    #[test]
    fn missing_credentials_lists_unset_fields() {
        let trakt = TraktConfig {
            client_id: Some(SecretString::from("abc".to_string())),
            client_secret: None,
            redirect_uri: String::new(),
            dry_run: false,
            page_size: 50,
            batch_delay_secs: 3.0,
        };
        assert_eq!(trakt.missing_credentials(), vec!["secret"]);
        assert_eq!(trakt.batch_delay(), Duration::from_secs(3));
    }

    #[test]
    fn batch_delay_out_of_range_uses_default() {
        let trakt = TraktConfig {
            client_id: None,
            client_secret: None,
            redirect_uri: String::new(),
            dry_run: false,
            page_size: 50,
            batch_delay_secs: 1e20,
        };
        assert_eq!(trakt.batch_delay(), Duration::from_secs(3));
    }
}
