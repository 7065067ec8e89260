//! Runtime configuration, loaded from YAML.
//!
//! Two documents are involved: the main config (tunables and file
//! locations) and the sources file it points at, which holds the list of
//! feeds and pages to aggregate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fetcher::FetchConfig;
use crate::filters::topic::DEFAULT_MIN_SCORE;
use crate::types::{RadarError, Result, Source};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    pub sources_file: PathBuf,
    /// Keyword tiers for the topic filter; the built-in AI/ML set applies
    /// when unset.
    pub keywords_file: Option<PathBuf>,
    pub update_interval_hours: i64,
    pub max_articles_per_source: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub proxy: Option<String>,
    pub enable_deduplication: bool,
    pub min_topic_score: f64,
    pub state_file: Option<PathBuf>,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            sources_file: PathBuf::from("sources.yaml"),
            keywords_file: None,
            update_interval_hours: 24,
            max_articles_per_source: 20,
            request_timeout_secs: 30,
            user_agent: "news-radar/1.0".to_string(),
            proxy: None,
            enable_deduplication: true,
            min_topic_score: DEFAULT_MIN_SCORE,
            state_file: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SourcesDoc {
    #[serde(default)]
    sources: Vec<Source>,
}

impl RadarConfig {
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&raw)
            .map_err(|e| RadarError::Config(format!("bad config {}: {}", path.display(), e)))?;
        config.validate()?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.update_interval_hours <= 0 {
            return Err(RadarError::Config(
                "update_interval_hours must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_topic_score) {
            return Err(RadarError::Config(
                "min_topic_score must be between 0.0 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the source list the config points at.
    pub fn load_sources(&self) -> Result<Vec<Source>> {
        let raw = std::fs::read_to_string(&self.sources_file)?;
        let doc: SourcesDoc = serde_yaml::from_str(&raw).map_err(|e| {
            RadarError::Config(format!(
                "bad sources file {}: {}",
                self.sources_file.display(),
                e
            ))
        })?;
        info!(
            "loaded {} sources from {}",
            doc.sources.len(),
            self.sources_file.display()
        );
        Ok(doc.sources)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout_secs: self.request_timeout_secs,
            proxy: self.proxy.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_sensible() {
        let config = RadarConfig::default();
        assert_eq!(config.update_interval_hours, 24);
        assert_eq!(config.max_articles_per_source, 20);
        assert!(config.enable_deduplication);
        assert_eq!(config.min_topic_score, DEFAULT_MIN_SCORE);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "update_interval_hours: 6\nproxy: http://localhost:8080\n").unwrap();

        let config = RadarConfig::from_yaml(&path).unwrap();
        assert_eq!(config.update_interval_hours, 6);
        assert_eq!(config.proxy.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.max_articles_per_source, 20);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "min_topic_score: 2.5\n").unwrap();
        assert!(matches!(
            RadarConfig::from_yaml(&path),
            Err(RadarError::Config(_))
        ));
    }

    #[test]
    fn sources_file_parses_typed_entries() {
        let dir = tempdir().unwrap();
        let sources = dir.path().join("sources.yaml");
        std::fs::write(
            &sources,
            r#"
sources:
  - name: Tech Wire
    url: https://example.com/feed.xml
    type: rss
    max_articles: 10
  - name: AI Page
    url: https://example.com/news
    type: html
    selector: ".article-card"
  - name: Subscriptions
    type: opml
    file_path: feeds.opml
  - name: Mystery
    url: https://example.com
    type: telegraph
"#,
        )
        .unwrap();

        let config = RadarConfig {
            sources_file: sources,
            ..Default::default()
        };
        let loaded = config.load_sources().unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded[0].kind, SourceKind::Rss);
        assert_eq!(loaded[1].selector.as_deref(), Some(".article-card"));
        assert_eq!(loaded[2].kind, SourceKind::Opml);
        // Unrecognized type strings survive loading and fail at run time.
        assert_eq!(loaded[3].kind, SourceKind::Unknown);
    }
}
