//! Config file loading and layering
//!
//! The bundled defaults form the bottom layer; an optional user overlay is
//! merged on top of them per key. Both layers go through figment so the merge
//! rules are figment's: incoming values win, sections are unioned.

use super::error::{ConfigError, ConfigValidationError};
use super::ini::{IniDocument, Sections};
use super::schema::{known_keys, ResolvedConfig};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

/// Defaults compiled into the binary.
pub const BUNDLED_DEFAULTS: &str = include_str!("../../config.defaults.ini");

/// Overlay file looked up in the working directory when none is given.
pub const DEFAULT_OVERLAY_FILE: &str = "config.ini";

/// Where a configuration layer comes from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Text { name: String, contents: String },
}

impl ConfigSource {
    pub fn bundled() -> Self {
        ConfigSource::Text { name: "bundled defaults".to_string(), contents: BUNDLED_DEFAULTS.to_string() }
    }

    pub fn text(name: impl Into<String>, contents: impl Into<String>) -> Self {
        ConfigSource::Text { name: name.into(), contents: contents.into() }
    }

    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => path.display().to_string(),
            ConfigSource::Text { name, .. } => name.clone(),
        }
    }

    fn parse(&self) -> Result<IniDocument, ConfigError> {
        match self {
            ConfigSource::File(path) => {
                let content = fs::read_to_string(path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                IniDocument::parse(&path.display().to_string(), &content)
            }
            ConfigSource::Text { name, contents } => IniDocument::parse(name, contents),
        }
    }
}

/// When to complain about missing Trakt credentials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CredentialPolicy {
    /// Leave it to the Trakt client, which knows whether dry-run applies.
    #[default]
    Deferred,
    /// Fail the load when `dry_run` is off and `id` or `secret` is unset.
    AtLoad,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Reject overlay sections/keys outside the schema instead of passing them through.
    pub strict: bool,
    pub credentials: CredentialPolicy,
    /// Dry run requested outside the config files (e.g. `import --dry-run`).
    pub dry_run_override: bool,
}

/// Load `defaults`, merge `overlay` over it, and coerce the result.
pub fn load_config(
    defaults: &ConfigSource,
    overlay: Option<&ConfigSource>,
    options: &LoadOptions,
) -> Result<ResolvedConfig, ConfigError> {
    let base = defaults.parse()?;
    let mut figment = Figment::from(base);

    if let Some(source) = overlay {
        let layer = source.parse()?;
        if options.strict {
            reject_unknown(layer.sections())?;
        }
        tracing::debug!("Merging configuration overlay {}", layer.origin());
        figment = figment.merge(layer);
    }

    let merged: Sections = figment.extract()?;
    let config = ResolvedConfig::from_sections(&merged)?;

    let dry_run = config.trakt.dry_run || options.dry_run_override;
    if options.credentials == CredentialPolicy::AtLoad && !dry_run {
        let missing = config.trakt.missing_credentials();
        if !missing.is_empty() {
            return Err(ConfigValidationError::MissingCredentials { missing: missing.join(", ") }.into());
        }
    }

    Ok(config)
}

/// The overlay to use: an explicit path (which must exist) or `config.ini` in `dir`.
pub fn discover_overlay(dir: &Path, explicit: Option<&Path>) -> Option<ConfigSource> {
    if let Some(path) = explicit {
        return Some(ConfigSource::File(path.to_path_buf()));
    }
    let candidate = dir.join(DEFAULT_OVERLAY_FILE);
    candidate.is_file().then_some(ConfigSource::File(candidate))
}

fn reject_unknown(sections: &Sections) -> Result<(), ConfigValidationError> {
    for (section, entries) in sections {
        let Some(keys) = known_keys(section) else {
            return Err(ConfigValidationError::UnknownSection { section: section.clone() });
        };
        if let Some(key) = entries.keys().find(|k| !keys.contains(&k.as_str())) {
            return Err(ConfigValidationError::UnknownKey { section: section.clone(), key: key.clone() });
        }
    }
    Ok(())
}
