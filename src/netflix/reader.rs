//! Viewing-history CSV reader

use super::history::NetflixHistory;
use crate::config::NetflixConfig;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed opening viewing history {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed reading viewing history: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV delimiter must be an ASCII character, got '{0}'")]
    Delimiter(char),
}

/// Read the export at `path` using the `[Netflix]` options.
pub fn read_viewing_history(path: &Path, config: &NetflixConfig) -> Result<NetflixHistory, HistoryError> {
    let file = File::open(path).map_err(|source| HistoryError::Open { path: path.to_path_buf(), source })?;
    parse_viewing_history(file, config.viewing_history_delimiter, &config.viewing_history_datetime_format)
}

/// Parse `Title,Date` rows. The first row is the export's header and is skipped.
pub fn parse_viewing_history<R: Read>(
    reader: R,
    delimiter: char,
    datetime_format: &str,
) -> Result<NetflixHistory, HistoryError> {
    if !delimiter.is_ascii() {
        return Err(HistoryError::Delimiter(delimiter));
    }
    let delimiter = delimiter as u8;
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let mut history = NetflixHistory::new(datetime_format);
    let mut line_count = 0usize;

    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        if idx == 0 {
            continue;
        }
        let (Some(title), Some(date)) = (record.get(0), record.get(1)) else {
            tracing::warn!("Skipping CSV row {}: expected Title and Date columns", idx + 1);
            continue;
        };
        tracing::debug!("Parsed CSV file entry: {date} : {title}");
        history.add_entry(title, date);
        line_count += 1;
    }

    history.resolve_ambiguous();
    tracing::info!("Processed {line_count} lines.");
    Ok(history)
}
