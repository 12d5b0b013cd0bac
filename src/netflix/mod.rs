//! Netflix viewing-history ingestion

pub mod classify;
pub mod dates;
pub mod history;
pub mod reader;

pub use history::{Episode, Movie, NetflixHistory, Season, TvShow};
pub use reader::{parse_viewing_history, read_viewing_history, HistoryError};
