//! Viewing dates to Trakt timestamps
//!
//! Netflix exports only carry a date, so every entry is stamped 20:15.

use chrono::NaiveDateTime;
use thiserror::Error;

pub const WATCHED_TIME: &str = "20:15";
pub const TRAKT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.00Z";
const FALLBACK_FORMAT: &str = "%m.%d.%y";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("'{0}' is not a date")]
    NotADate(String),

    #[error("could not parse date '{value}' with '{format}' or '%m.%d.%y'")]
    Unparsable { value: String, format: String },
}

/// Header cells and blank cells end up here when a file is malformed.
pub fn looks_like_date(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if lower == "date" || lower == "datum" {
        return false;
    }
    trimmed.chars().any(|c| c.is_ascii_digit())
}

/// Convert a Netflix date to a Trakt `watched_at` timestamp.
///
/// Tries `format` first, then every non-digit replaced by `.` against `%m.%d.%y`.
pub fn to_trakt_timestamp(value: &str, format: &str) -> Result<String, DateError> {
    let value = value.trim();
    if !looks_like_date(value) {
        return Err(DateError::NotADate(value.to_string()));
    }

    let primary = NaiveDateTime::parse_from_str(
        &format!("{value} {WATCHED_TIME}"),
        &format!("{format} %H:%M"),
    );
    let parsed = match primary {
        Ok(dt) => dt,
        Err(_) => {
            let dotted: String =
                value.chars().map(|c| if c.is_ascii_digit() { c } else { '.' }).collect();
            NaiveDateTime::parse_from_str(
                &format!("{dotted} {WATCHED_TIME}"),
                &format!("{FALLBACK_FORMAT} %H:%M"),
            )
            .map_err(|_| DateError::Unparsable { value: value.to_string(), format: format.to_string() })?
        }
    };

    Ok(parsed.format(TRAKT_TIMESTAMP_FORMAT).to_string())
}
