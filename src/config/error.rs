//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, parsing, or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config syntax in {origin} at line {line}: {message}")]
    Syntax { origin: String, line: usize, message: String },

    #[error("Failed merging configuration layers: {0}")]
    Merge(#[from] figment::Error),

    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}

/// A value or key in the merged configuration does not satisfy the schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("Missing required key '{key}' in section [{section}]")]
    MissingKey { section: String, key: String },

    #[error("Invalid boolean for [{section}] {key}: '{value}' (expected True/False or 1/0)")]
    InvalidBool { section: String, key: String, value: String },

    #[error("Invalid integer for [{section}] {key}: '{value}'")]
    InvalidInteger { section: String, key: String, value: String },

    #[error("[{section}] {key} must be a positive integer, got {value}")]
    NonPositiveInteger { section: String, key: String, value: i64 },

    #[error("Invalid number for [{section}] {key}: '{value}'")]
    InvalidNumber { section: String, key: String, value: String },

    #[error("Invalid value for [Logging] level: '{value}' (accepted: {accepted})")]
    InvalidLevel { value: String, accepted: String },

    #[error("[{section}] {key} must be a single character, got '{value}'")]
    InvalidDelimiter { section: String, key: String, value: String },

    #[error("[{section}] {key} must not be empty")]
    EmptyValue { section: String, key: String },

    #[error("Bad interpolation in [{section}] {key}: {message}")]
    Interpolation { section: String, key: String, message: String },

    #[error("Unknown section [{section}] in overlay configuration")]
    UnknownSection { section: String },

    #[error("Unknown key '{key}' in section [{section}] of overlay configuration")]
    UnknownKey { section: String, key: String },

    #[error("Trakt credentials missing ({missing}) and dry_run is disabled")]
    MissingCredentials { missing: String },
}
