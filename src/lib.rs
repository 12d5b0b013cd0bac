//! netflix2trakt: import Netflix viewing history into Trakt.tv
//!
//! Reads the `NetflixViewingHistory.csv` export, classifies each title as an
//! episode or a movie, resolves it on TMDB and adds the plays to the Trakt
//! watch history in rate-limited batches.

pub mod cli;
pub mod config;
pub mod import;
pub mod logging;
pub mod netflix;
pub mod tmdb;
pub mod trakt;
