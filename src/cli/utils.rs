//! Helpers shared by the CLI commands.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::config::{discover_overlay, load_config, ConfigSource, CredentialPolicy, LoadOptions, ResolvedConfig};
use crate::trakt::{authorize, TokenStore, TraktClient, TRAKT_AUTH_FILE};

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOpts {
    /// Overlay config file (default: ./config.ini when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replace the bundled defaults with this file
    #[arg(long, global = true, value_name = "FILE")]
    pub defaults: Option<PathBuf>,

    /// Reject unknown sections and keys in the overlay
    #[arg(long, global = true)]
    pub strict_config: bool,

    /// Fail while loading when Trakt credentials are missing and dry_run is off
    #[arg(long, global = true)]
    pub require_credentials: bool,
}

/// Load the layered config. `dry_run` is a dry run requested on the command line.
pub fn load_settings(opts: &ConfigOpts, dry_run: bool) -> Result<ResolvedConfig> {
    let defaults = match &opts.defaults {
        Some(path) => ConfigSource::File(path.clone()),
        None => ConfigSource::bundled(),
    };
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let overlay = discover_overlay(&cwd, opts.config.as_deref());
    let options = LoadOptions {
        strict: opts.strict_config,
        credentials: if opts.require_credentials { CredentialPolicy::AtLoad } else { CredentialPolicy::Deferred },
        dry_run_override: dry_run,
    };

    let described = overlay.as_ref().map(ConfigSource::describe).unwrap_or_else(|| defaults.describe());
    load_config(&defaults, overlay.as_ref(), &options)
        .with_context(|| format!("Failed to load configuration ({described})"))
}

/// Build an authenticated Trakt client, running the device flow if needed.
pub fn connect_trakt(config: &ResolvedConfig) -> Result<TraktClient> {
    let mut client = TraktClient::new(&config.trakt)?;
    let store = TokenStore::new(TRAKT_AUTH_FILE);
    let token = authorize(&client, &store, chrono::Utc::now().timestamp()).context("Trakt authentication failed")?;
    client.set_token(&token);
    Ok(client)
}
