//! Persistent run state for incremental aggregation.
//!
//! A small JSON document tracking the last successful fetch time and
//! cumulative per-source counters. Missing or corrupt files are treated as
//! empty state so incremental runs degrade to full runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStats {
    pub total_articles: usize,
    pub fetch_count: usize,
    #[serde(default)]
    pub last_fetch: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDoc {
    #[serde(default)]
    last_fetch_time: Option<DateTime<Utc>>,
    #[serde(default)]
    source_stats: HashMap<String, SourceStats>,
}

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get_last_fetch_time(&self) -> Option<DateTime<Utc>> {
        self.load().last_fetch_time
    }

    pub fn set_last_fetch_time(&self, time: DateTime<Utc>) -> Result<()> {
        let mut doc = self.load();
        doc.last_fetch_time = Some(time);
        self.save(&doc)
    }

    /// Add one fetch's article count to a source's cumulative counters.
    pub fn update_source_stats(&self, source: &str, articles: usize) -> Result<()> {
        let mut doc = self.load();
        let stats = doc.source_stats.entry(source.to_string()).or_default();
        stats.total_articles += articles;
        stats.fetch_count += 1;
        stats.last_fetch = Some(Utc::now());
        self.save(&doc)
    }

    pub fn get_source_stats(&self, source: &str) -> Option<SourceStats> {
        self.load().source_stats.get(source).cloned()
    }

    pub fn all_source_stats(&self) -> HashMap<String, SourceStats> {
        self.load().source_stats
    }

    /// Delete the state file. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load(&self) -> StateDoc {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("no state file at {}: {}", self.path.display(), e);
                return StateDoc::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    "corrupt state file {}, starting fresh: {}",
                    self.path.display(),
                    e
                );
                StateDoc::default()
            }
        }
    }

    fn save(&self, doc: &StateDoc) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(doc)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.get_last_fetch_time().is_none());
        assert!(store.get_source_stats("x").is_none());
    }

    #[test]
    fn last_fetch_time_round_trips() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        let now = Utc::now();
        store.set_last_fetch_time(now).unwrap();
        assert_eq!(store.get_last_fetch_time(), Some(now));
    }

    #[test]
    fn source_stats_accumulate() {
        let dir = tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        store.update_source_stats("Wire", 5).unwrap();
        store.update_source_stats("Wire", 3).unwrap();

        let stats = store.get_source_stats("Wire").unwrap();
        assert_eq!(stats.total_articles, 8);
        assert_eq!(stats.fetch_count, 2);
        assert!(stats.last_fetch.is_some());
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = StateStore::new(&path);
        assert!(store.get_last_fetch_time().is_none());
        // And the next write recovers it.
        store.update_source_stats("Wire", 1).unwrap();
        assert_eq!(store.get_source_stats("Wire").unwrap().fetch_count, 1);
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);
        store.set_last_fetch_time(Utc::now()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        store.clear().unwrap();
    }
}
