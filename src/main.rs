//! netflix2trakt: Import a Netflix viewing history export into Trakt.tv
//!
//! Titles are matched on TMDB and synced to the Trakt watch history.

use anyhow::Result;

fn main() -> Result<()> {
    netflix2trakt::cli::run()
}
