//! Auth command implementation

use anyhow::Result;

use super::utils::{connect_trakt, load_settings, ConfigOpts};
use crate::trakt::TRAKT_AUTH_FILE;

pub fn run(opts: &ConfigOpts, verbose: bool) -> Result<()> {
    let config = load_settings(opts, false)?;
    crate::logging::init(&config.logging, verbose)?;

    connect_trakt(&config)?;
    println!("Trakt authentication is ready (token stored in {TRAKT_AUTH_FILE}).");
    Ok(())
}
