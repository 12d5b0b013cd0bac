//! Configuration loading and merging
//!
//! Bundled INI defaults are layered under an optional user overlay
//! (`config.ini`), then coerced into an immutable [`ResolvedConfig`] that is
//! passed by reference to everything that needs it.

pub mod error;
pub mod ini;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigValidationError};
pub use loader::{
    discover_overlay, load_config, ConfigSource, CredentialPolicy, LoadOptions, BUNDLED_DEFAULTS,
    DEFAULT_OVERLAY_FILE,
};
pub use schema::{LogLevel, LoggingConfig, NetflixConfig, ResolvedConfig, TmdbConfig, TraktConfig};
