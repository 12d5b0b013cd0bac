//! Persistent TMDB search cache (`tmdb_cache.json`)

use super::TmdbSearchResult;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const TMDB_CACHE_FILE: &str = "tmdb_cache.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Tv,
    Movie,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Tv => "tv",
            MediaKind::Movie => "movie",
        }
    }
}

/// Search hits keyed by kind and lowercased title.
///
/// Every insert rewrites the file through a temp file and a rename, so an
/// interrupted run never leaves a truncated cache behind.
#[derive(Debug, Default)]
pub struct TmdbCache {
    path: Option<PathBuf>,
    entries: BTreeMap<String, TmdbSearchResult>,
    hits: usize,
    misses: usize,
}

impl TmdbCache {
    /// Load `path`; a missing or unreadable file starts an empty cache.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt TMDB cache {}: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Failed reading TMDB cache {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        tracing::debug!("Loaded {} TMDB cache entries", entries.len());
        Self { path: Some(path), entries, hits: 0, misses: 0 }
    }

    /// A cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    fn key(kind: MediaKind, title: &str) -> String {
        format!("{}:{}", kind.as_str(), title.to_lowercase())
    }

    pub fn get(&mut self, kind: MediaKind, title: &str) -> Option<TmdbSearchResult> {
        match self.entries.get(&Self::key(kind, title)) {
            Some(hit) => {
                self.hits += 1;
                tracing::debug!("TMDB cache hit: {title}");
                Some(hit.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a hit and persist. A failed write keeps the entry for this run only.
    pub fn insert(&mut self, kind: MediaKind, title: &str, result: TmdbSearchResult) {
        self.entries.insert(Self::key(kind, title), result);
        if let Some(path) = &self.path {
            if let Err(e) = write_atomic(path, &self.entries) {
                tracing::debug!("Failed writing TMDB cache {}: {e}", path.display());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn log_summary(&self) {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            return;
        }
        let rate = self.hits as f64 * 100.0 / lookups as f64;
        tracing::info!(
            "TMDB cache: {} hits, {} misses ({rate:.1}% hit rate), {} entries",
            self.hits,
            self.misses,
            self.entries.len()
        );
    }
}

fn write_atomic(path: &Path, entries: &BTreeMap<String, TmdbSearchResult>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    let tmp_path = path.with_extension("json.tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&tmp_path, json)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn hit(id: u64, name: &str) -> TmdbSearchResult {
        TmdbSearchResult { id, name: Some(name.to_string()), ..Default::default() }
    }

    #[test]
    fn lookups_are_case_insensitive_and_namespaced() {
        let mut cache = TmdbCache::in_memory();
        cache.insert(MediaKind::Tv, "Dark", hit(70523, "Dark"));

        assert_eq!(cache.get(MediaKind::Tv, "DARK").map(|r| r.id), Some(70523));
        assert!(cache.get(MediaKind::Movie, "Dark").is_none());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn persists_and_reloads() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(TMDB_CACHE_FILE);

        let mut cache = TmdbCache::open(&path);
        assert!(cache.is_empty());
        cache.insert(MediaKind::Movie, "Roma", hit(426426, "Roma"));

        assert!(path.exists());
        assert!(!tmp.path().join("tmdb_cache.json.tmp").exists());

        let mut reloaded = TmdbCache::open(&path);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(MediaKind::Movie, "roma").map(|r| r.id), Some(426426));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let tmp = TempDir::new().expect("tmp");
        let path = tmp.path().join(TMDB_CACHE_FILE);
        fs::write(&path, "{not json").expect("write");

        let cache = TmdbCache::open(&path);
        assert!(cache.is_empty());
    }
}
