//! The import pipeline and its diagnostic reports

pub mod pipeline;
pub mod report;

pub use pipeline::{ImportError, ImportStats, Importer, LookupRetry};
pub use report::{write_failed_items, NotFoundReport, NOT_FOUND_FILE, UNCATEGORIZED_FILE};
