//! Config command implementation

use anyhow::Result;
use clap::{Args, Subcommand};

use super::utils::{load_settings, ConfigOpts};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the merged configuration with secrets redacted
    Show,

    /// Validate the configuration and report which credentials are set
    Check,
}

pub fn run(args: ConfigArgs, opts: &ConfigOpts) -> Result<()> {
    let config = load_settings(opts, false)?;

    match args.action {
        ConfigAction::Show => print!("{}", config.to_redacted_ini()),
        ConfigAction::Check => {
            let set = |present: bool| if present { "set" } else { "missing" };
            println!("Configuration OK");
            println!("  TMDB api_key:    {}", set(config.tmdb.api_key.is_some()));
            println!("  Trakt id:        {}", set(config.trakt.client_id.is_some()));
            println!("  Trakt secret:    {}", set(config.trakt.client_secret.is_some()));
            println!("  Trakt dry_run:   {}", config.trakt.dry_run);
            println!("  Trakt page_size: {}", config.trakt.page_size);

            let missing = config.trakt.missing_credentials();
            if !missing.is_empty() && !config.trakt.dry_run {
                println!("warning: Trakt {} not set; imports will fail unless dry_run is enabled", missing.join(" and "));
            }
            if config.tmdb.api_key.is_none() {
                println!("warning: [TMDB] api_key not set; imports need a TMDB API key");
            }
        }
    }
    Ok(())
}
