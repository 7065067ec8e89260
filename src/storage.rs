//! JSON snapshot storage for aggregated articles.
//!
//! Each save writes a full snapshot document and keeps a timestamped backup
//! of whatever it overwrites. Query helpers load the whole snapshot; the
//! store is a file, not a database.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::types::{Article, RadarError, Result};

const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: String,
    generated_at: DateTime<Utc>,
    count: usize,
    articles: Vec<Article>,
}

pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a full snapshot, backing up any existing file first.
    pub fn save(&self, articles: &[Article]) -> Result<()> {
        if self.path.exists() {
            let backup = self.backup()?;
            debug!("backed up previous snapshot to {}", backup.display());
        }

        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION.to_string(),
            generated_at: Utc::now(),
            count: articles.len(),
            articles: articles.to_vec(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, raw)?;

        info!("saved {} articles to {}", articles.len(), self.path.display());
        Ok(())
    }

    /// Copy the current snapshot to an explicit destination.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        std::fs::copy(&self.path, dest)?;
        Ok(())
    }

    /// Copy the current snapshot to a timestamped sibling file.
    pub fn backup(&self) -> Result<PathBuf> {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("articles");
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let backup = self
            .path
            .with_file_name(format!("{}.backup_{}.json", stem, stamp));
        std::fs::copy(&self.path, &backup)?;
        Ok(backup)
    }

    /// Load all stored articles. A missing file is an empty store; a corrupt
    /// file is an error, since silently discarding data here would lose it
    /// on the next save.
    pub fn load(&self) -> Result<Vec<Article>> {
        Ok(self.load_snapshot()?.map(|s| s.articles).unwrap_or_default())
    }

    pub fn load_metadata(&self) -> Result<Option<SnapshotMeta>> {
        Ok(self.load_snapshot()?.map(|s| SnapshotMeta {
            version: s.version,
            generated_at: s.generated_at,
            count: s.count,
        }))
    }

    fn load_snapshot(&self) -> Result<Option<Snapshot>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    /// Merge new articles into the store, discarding any whose URL is
    /// already present. Returns the number actually added.
    pub fn append(&self, articles: Vec<Article>) -> Result<usize> {
        let mut existing = self.load()?;
        let seen: BTreeSet<String> = existing.iter().map(|a| a.url.clone()).collect();

        let fresh: Vec<Article> = articles
            .into_iter()
            .filter(|a| !seen.contains(&a.url))
            .collect();
        let added = fresh.len();
        if added == 0 {
            debug!("append: nothing new");
            return Ok(0);
        }

        existing.extend(fresh);
        self.save(&existing)?;
        Ok(added)
    }

    pub fn get_count(&self) -> Result<usize> {
        Ok(self.load_metadata()?.map(|m| m.count).unwrap_or(0))
    }

    pub fn get_by_source(&self, source: &str) -> Result<Vec<Article>> {
        let wanted = source.to_lowercase();
        Ok(self
            .load()?
            .into_iter()
            .filter(|a| a.source.to_lowercase() == wanted)
            .collect())
    }

    pub fn get_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Article>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|a| matches!(a.date, Some(d) if d >= start && d <= end))
            .collect())
    }

    /// Substring match over the named fields (`title`, `description`,
    /// `tags`, `source`). An empty field list means title and description.
    pub fn get_by_keywords(
        &self,
        keywords: &[String],
        fields: &[&str],
        case_sensitive: bool,
    ) -> Result<Vec<Article>> {
        let fields: &[&str] = if fields.is_empty() {
            &["title", "description"]
        } else {
            fields
        };
        let needles: Vec<String> = keywords
            .iter()
            .map(|k| {
                if case_sensitive {
                    k.clone()
                } else {
                    k.to_lowercase()
                }
            })
            .collect();

        Ok(self
            .load()?
            .into_iter()
            .filter(|a| {
                let mut haystack = String::new();
                for field in fields {
                    match *field {
                        "title" => haystack.push_str(&a.title),
                        "description" => haystack.push_str(&a.description),
                        "tags" => haystack.push_str(&a.tags.join(" ")),
                        "source" => haystack.push_str(&a.source),
                        _ => {}
                    }
                    haystack.push(' ');
                }
                if !case_sensitive {
                    haystack = haystack.to_lowercase();
                }
                needles.iter().any(|n| haystack.contains(n))
            })
            .collect())
    }

    /// The `n` most recent articles by date; undated articles sort last.
    pub fn get_latest(&self, n: usize) -> Result<Vec<Article>> {
        let mut articles = self.load()?;
        articles.sort_by(|a, b| b.date.cmp(&a.date));
        articles.truncate(n);
        Ok(articles)
    }

    pub fn get_sources(&self) -> Result<Vec<String>> {
        let sources: BTreeSet<String> = self
            .load()?
            .into_iter()
            .map(|a| a.source)
            .filter(|s| !s.is_empty())
            .collect();
        Ok(sources.into_iter().collect())
    }

    /// Delete the snapshot file. Missing files are fine.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared snapshot {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Flatten articles into CSV. The header is the sorted union of every key
/// present across the serialized articles, so optional fields appear only
/// when at least one article carries them.
pub fn export_csv(articles: &[Article], path: &Path) -> Result<()> {
    let rows: Vec<Value> = articles
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<_, _>>()?;

    let mut columns: BTreeSet<String> = BTreeSet::new();
    for row in &rows {
        if let Value::Object(map) = row {
            columns.extend(map.keys().cloned());
        }
    }
    let columns: Vec<String> = columns.into_iter().collect();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| RadarError::General(format!("csv open failed: {}", e)))?;
    writer
        .write_record(&columns)
        .map_err(|e| RadarError::General(format!("csv write failed: {}", e)))?;

    for row in &rows {
        let record: Vec<String> = columns
            .iter()
            .map(|col| match row.get(col) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(Value::Array(items)) => items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(other) => other.to_string(),
            })
            .collect();
        writer
            .write_record(&record)
            .map_err(|e| RadarError::General(format!("csv write failed: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| RadarError::General(format!("csv flush failed: {}", e)))?;

    if rows.is_empty() {
        warn!("exported empty CSV to {}", path.display());
    } else {
        info!("exported {} articles to {}", rows.len(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::tempdir;

    fn article(title: &str, url: &str, source: &str) -> Article {
        Article {
            title: title.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            date: Some(Utc::now()),
            ..Default::default()
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        let articles = vec![article("one", "https://x/1", "A")];

        storage.save(&articles).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "one");

        let meta = storage.load_metadata().unwrap().unwrap();
        assert_eq!(meta.version, "1.0");
        assert_eq!(meta.count, 1);
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        assert!(storage.load().unwrap().is_empty());
        assert!(storage.load_metadata().unwrap().is_none());
        assert_eq!(storage.get_count().unwrap(), 0);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, "{broken").unwrap();
        assert!(JsonStorage::new(&path).load().is_err());
    }

    #[test]
    fn append_discards_known_urls() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        storage.save(&[article("one", "https://x/1", "A")]).unwrap();

        let added = storage
            .append(vec![
                article("one again", "https://x/1", "A"),
                article("two", "https://x/2", "B"),
            ])
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(storage.get_count().unwrap(), 2);
    }

    #[test]
    fn save_backs_up_previous_snapshot() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        storage.save(&[article("one", "https://x/1", "A")]).unwrap();
        storage.save(&[article("two", "https://x/2", "A")]).unwrap();

        let backups: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("articles.backup_")
            })
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[test]
    fn query_helpers() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        let mut old = article("machine learning retro", "https://x/1", "A");
        old.date = Some(Utc::now() - Duration::days(10));
        let recent = article("fresh news", "https://x/2", "B");
        storage.save(&[old, recent]).unwrap();

        assert_eq!(storage.get_by_source("b").unwrap().len(), 1);
        assert_eq!(
            storage
                .get_by_time_range(Utc::now() - Duration::days(1), Utc::now())
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            storage
                .get_by_keywords(&["LEARNING".to_string()], &[], false)
                .unwrap()
                .len(),
            1
        );
        assert!(storage
            .get_by_keywords(&["LEARNING".to_string()], &[], true)
            .unwrap()
            .is_empty());
        let latest = storage.get_latest(1).unwrap();
        assert_eq!(latest[0].title, "fresh news");
        assert_eq!(storage.get_sources().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = JsonStorage::new(dir.path().join("articles.json"));
        storage.save(&[article("one", "https://x/1", "A")]).unwrap();
        storage.clear().unwrap();
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn csv_header_is_union_of_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut a = article("one", "https://x/1", "A");
        a.tags = vec!["ai".to_string(), "ml".to_string()];
        let b = article("two", "https://x/2", "B");

        export_csv(&[a, b], &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        let header = raw.lines().next().unwrap();
        assert!(header.contains("tags"));
        assert!(header.contains("title"));
        assert!(raw.contains("ai, ml"));
    }
}
