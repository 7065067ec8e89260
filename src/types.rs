use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized news item. The `url` acts as the natural key.
///
/// `ai_score` is a transient annotation attached by the topic filter; it is
/// stripped at the serialization boundary and never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bilingual_title: Option<String>,
    /// Names of other sources that carried the same story, filled in by the
    /// duplicate filter's merge mode.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_sources: Vec<String>,
    #[serde(skip)]
    pub ai_score: Option<f64>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Article {
    /// An article is valid only with a non-empty trimmed title and url.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.url.trim().is_empty()
    }
}

/// Source kind dispatched on by the aggregator. Unrecognized strings in the
/// configuration map to `Unknown` and count as a failed source at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Rss,
    Html,
    Opml,
    #[serde(other)]
    Unknown,
}

/// A configured origin: feed URL, HTML page, or OPML file.
///
/// Loaded once per aggregation run from configuration and never mutated by
/// the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// File path for OPML sources; falls back to `url` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_articles: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub field_selectors: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_feeds: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_articles_per_feed: Option<usize>,
}

/// A feed discovered inside an OPML outline. Carries no article content;
/// the aggregator fans out over these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPointer {
    pub title: String,
    pub url: String,
}

/// Immutable per-run statistics, returned from each aggregation rather than
/// accumulated on the orchestrator, so repeated runs start clean.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    pub total_fetched: usize,
    pub total_filtered: usize,
    pub total_kept: usize,
    pub sources_processed: usize,
    pub sources_failed: usize,
    /// Number of new articles found, incremental mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_articles: Option<usize>,
    /// Wall-clock duration in seconds, set by the `*_with_stats` wrappers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Result of one aggregation run: the surviving articles plus statistics.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub articles: Vec<Article>,
    pub stats: RunStats,
}

#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed for {url}: HTTP {status}")]
    FetchStatus { url: String, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, RadarError>;
