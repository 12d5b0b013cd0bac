//! Diagnostic CSV files written during an import

use crate::trakt::FailedItem;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const NOT_FOUND_FILE: &str = "not_found.csv";
pub const UNCATEGORIZED_FILE: &str = "uncategorized_sync.csv";

/// `not_found.csv`: titles that could not be matched, one row per title.
pub struct NotFoundReport {
    writer: csv::Writer<Box<dyn Write>>,
    recorded: usize,
}

impl std::fmt::Debug for NotFoundReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotFoundReport").field("recorded", &self.recorded).finish()
    }
}

impl NotFoundReport {
    /// Truncate `path` and write the header row.
    pub fn create(path: &Path) -> Result<Self, csv::Error> {
        let file = File::create(path)?;
        Self::from_writer(Box::new(file))
    }

    pub fn from_writer(writer: Box<dyn Write>) -> Result<Self, csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(["Show", "Season", "Episode"])?;
        writer.flush()?;
        Ok(Self { writer, recorded: 0 })
    }

    /// Append one row. Write failures are logged and otherwise ignored.
    pub fn record(&mut self, title: &str, season: Option<u32>, episode: Option<&str>) {
        let season = season.map(|s| s.to_string()).unwrap_or_default();
        let result = self
            .writer
            .write_record([title, season.as_str(), episode.unwrap_or("")])
            .and_then(|()| self.writer.flush().map_err(csv::Error::from));
        match result {
            Ok(()) => self.recorded += 1,
            Err(e) => tracing::debug!("Failed recording '{title}' in {NOT_FOUND_FILE}: {e}"),
        }
    }

    pub fn recorded(&self) -> usize {
        self.recorded
    }
}

/// Write entries Trakt never acknowledged. Returns the number of rows.
pub fn write_failed_items(path: &Path, items: &[FailedItem]) -> Result<usize, csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Type", "Title", "WatchedAt", "TmdbId"])?;
    for item in items {
        let tmdb_id = item.tmdb_id().map(|id| id.to_string()).unwrap_or_default();
        writer.write_record([item.kind(), item.title(), item.watched_at(), tmdb_id.as_str()])?;
    }
    writer.flush()?;
    Ok(items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trakt::{HistoryEpisode, HistoryMovie, Ids};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn not_found_report_writes_header_and_rows() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(NOT_FOUND_FILE);
        fs::write(&path, "stale contents\n").expect("write");

        let mut report = NotFoundReport::create(&path).expect("create");
        report.record("Dark", Some(1), Some("Secrets, Part 2"));
        report.record("Unknown Film", None, None);

        let text = fs::read_to_string(&path).expect("read");
        assert_eq!(text, "Show,Season,Episode\nDark,1,\"Secrets, Part 2\"\nUnknown Film,,\n");
        assert_eq!(report.recorded(), 2);
    }

    #[test]
    fn failed_items_are_listed() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(UNCATEGORIZED_FILE);
        let items = vec![
            FailedItem::Movie(HistoryMovie {
                title: "Roma".into(),
                watched_at: "2018-12-02T20:15:00.00Z".into(),
                ids: Ids::tmdb(426426),
            }),
            FailedItem::Episode(HistoryEpisode {
                watched_at: "2017-12-01T20:15:00.00Z".into(),
                ids: Ids::tmdb(1),
                label: "Dark S01E01 Secrets".into(),
            }),
        ];

        assert_eq!(write_failed_items(&path, &items).expect("write"), 2);
        let text = fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("Type,Title,WatchedAt,TmdbId\n"));
        assert!(text.contains("movie,Roma,2018-12-02T20:15:00.00Z,426426"));
        assert!(text.contains("episode,Dark S01E01 Secrets,2017-12-01T20:15:00.00Z,1"));
    }
}
