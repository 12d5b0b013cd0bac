//! Command-line interface for netflix2trakt
//!
//! Provides `import`, `parse`, `auth`, `config` and `completions` subcommands.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

mod auth;
mod config;
mod import;
mod parse;
mod utils;

pub use utils::ConfigOpts;

/// Import a Netflix viewing history export into your Trakt.tv watch history
#[derive(Parser)]
#[command(name = "netflix2trakt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    config: ConfigOpts,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up every title on TMDB and add it to your Trakt history
    Import(import::ImportArgs),

    /// Parse the viewing history and print it as JSON
    Parse(parse::ParseArgs),

    /// Authenticate with Trakt (device code) or refresh the stored token
    Auth,

    /// Inspect the resolved configuration
    Config(config::ConfigArgs),

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => import::run(args, &cli.config, cli.verbose),
        Commands::Parse(args) => parse::run(args, &cli.config, cli.verbose),
        Commands::Auth => auth::run(&cli.config, cli.verbose),
        Commands::Config(args) => {
            crate::logging::init_stderr(cli.verbose);
            config::run(args, &cli.config)
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "netflix2trakt", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["netflix2trakt", "import", "--dry-run", "--config", "my.ini", "-v"])
            .expect("parse");
        assert!(cli.verbose);
        assert_eq!(cli.config.config.as_deref(), Some(std::path::Path::new("my.ini")));
        assert!(matches!(cli.command, Commands::Import(ref a) if a.dry_run));
    }
}
