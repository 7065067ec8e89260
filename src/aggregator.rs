//! The aggregation orchestrator.
//!
//! Pulls every configured source through fetch and parse, then runs the
//! filter chain (time window, topic relevance, duplicate removal) and
//! returns the surviving articles with per-run statistics. One failing
//! source never aborts the run.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::config::RadarConfig;
use crate::fetcher::{ContentFetcher, HttpFetcher};
use crate::filters::{DuplicateFilter, DuplicateOptions, KeywordSet, TimeFilter, TopicFilter};
use crate::parsers::{parse_opml, FeedParseOptions, FeedParser, HtmlParseOptions, HtmlParser};
use crate::state::StateStore;
use crate::storage::{self, JsonStorage};
use crate::types::{Article, RadarError, Result, RunOutcome, RunStats, Source, SourceKind};

const DEFAULT_MAX_FEEDS: usize = 10;
const DEFAULT_MAX_ARTICLES_PER_FEED: usize = 10;

pub struct NewsRadar {
    config: RadarConfig,
    fetcher: Box<dyn ContentFetcher>,
    feed_parser: FeedParser,
    html_parser: HtmlParser,
    topic_filter: TopicFilter,
    state: Option<StateStore>,
}

impl NewsRadar {
    pub fn new(config: RadarConfig) -> Result<Self> {
        let fetcher = Box::new(HttpFetcher::new(config.fetch_config())?);
        Self::with_fetcher(config, fetcher)
    }

    /// Construct with an injected fetcher. Tests use this to run the whole
    /// pipeline against canned content.
    pub fn with_fetcher(config: RadarConfig, fetcher: Box<dyn ContentFetcher>) -> Result<Self> {
        let topic_filter = match &config.keywords_file {
            Some(path) => TopicFilter::from_file(path)?,
            None => TopicFilter::with_keywords(KeywordSet::builtin())?,
        };
        let state = config.state_file.clone().map(StateStore::new);

        Ok(Self {
            config,
            fetcher,
            feed_parser: FeedParser::new(),
            html_parser: HtmlParser::new(),
            topic_filter,
            state,
        })
    }

    /// Run a full aggregation over every configured source.
    pub async fn aggregate(&self) -> Result<RunOutcome> {
        let sources = self.config.load_sources()?;
        info!("starting aggregation over {} sources", sources.len());

        let mut stats = RunStats::default();
        let mut collected: Vec<Article> = Vec::new();

        for source in &sources {
            match self.process_source(source).await {
                Ok(articles) => {
                    stats.sources_processed += 1;
                    stats.total_fetched += articles.len();
                    collected.extend(articles);
                }
                Err(e) => {
                    stats.sources_failed += 1;
                    error!("source '{}' failed: {}", source.name, e);
                }
            }
        }

        let filtered = self.apply_filters(collected);
        stats.total_kept = filtered.len();
        stats.total_filtered = stats.total_fetched - stats.total_kept;

        info!(
            "aggregation done: {} fetched, {} kept, {} sources failed",
            stats.total_fetched, stats.total_kept, stats.sources_failed
        );
        Ok(RunOutcome {
            articles: filtered,
            stats,
        })
    }

    /// Full aggregation plus wall-clock duration and a generation timestamp.
    pub async fn aggregate_with_stats(&self) -> Result<RunOutcome> {
        let started = Instant::now();
        let mut outcome = self.aggregate().await?;
        outcome.stats.duration = Some(started.elapsed().as_secs_f64());
        outcome.stats.generated_at = Some(Utc::now());
        Ok(outcome)
    }

    /// Incremental aggregation against a storage snapshot.
    ///
    /// Each source is sliced as it arrives: articles whose URL is already
    /// stored are dropped, then articles not strictly newer than the last
    /// recorded fetch time (undated articles are retained since their age
    /// is unknowable), and the source's cumulative counters advance on
    /// every run, including runs that find nothing. Only the surviving new
    /// articles go through the filter chain, so previously stored content
    /// never enters the duplicate filter's seen-sets. The kept articles are
    /// appended to storage and `last_fetch_time` is stamped at the end.
    pub async fn aggregate_incremental(&self, storage: &JsonStorage) -> Result<RunOutcome> {
        let Some(state) = self.state.as_ref() else {
            warn!("no state file configured, running a full aggregation instead");
            return self.aggregate().await;
        };

        let last_fetch = state.get_last_fetch_time();
        let known: HashSet<String> = storage.load()?.into_iter().map(|a| a.url).collect();
        let sources = self.config.load_sources()?;
        info!(
            "starting incremental aggregation over {} sources",
            sources.len()
        );

        let mut stats = RunStats::default();
        let mut fresh: Vec<Article> = Vec::new();

        for source in &sources {
            match self.process_source(source).await {
                Ok(articles) => {
                    stats.sources_processed += 1;
                    stats.total_fetched += articles.len();
                    let new_from_source: Vec<Article> = articles
                        .into_iter()
                        .filter(|a| !known.contains(&a.url))
                        .filter(|a| is_after(a.date, last_fetch))
                        .collect();
                    state.update_source_stats(&source.name, new_from_source.len())?;
                    fresh.extend(new_from_source);
                }
                Err(e) => {
                    stats.sources_failed += 1;
                    error!("source '{}' failed: {}", source.name, e);
                }
            }
        }

        stats.new_articles = Some(fresh.len());

        let filtered = self.apply_filters(fresh);
        stats.total_kept = filtered.len();
        stats.total_filtered = stats.total_fetched - stats.total_kept;

        state.set_last_fetch_time(Utc::now())?;
        let added = storage.append(filtered.clone())?;
        info!(
            "incremental run: {} new articles, {} stored",
            stats.new_articles.unwrap_or(0),
            added
        );

        Ok(RunOutcome {
            articles: filtered,
            stats,
        })
    }

    pub async fn aggregate_incremental_with_stats(
        &self,
        storage: &JsonStorage,
    ) -> Result<RunOutcome> {
        let started = Instant::now();
        let mut outcome = self.aggregate_incremental(storage).await?;
        outcome.stats.duration = Some(started.elapsed().as_secs_f64());
        outcome.stats.generated_at = Some(Utc::now());
        Ok(outcome)
    }

    /// Fetch and parse a single source into normalized articles.
    pub async fn process_source(&self, source: &Source) -> Result<Vec<Article>> {
        info!("processing source '{}'", source.name);
        let mut articles = match source.kind {
            SourceKind::Rss => self.process_rss(source).await,
            SourceKind::Html => self.process_html(source).await,
            SourceKind::Opml => self.process_opml(source).await,
            SourceKind::Unknown => Err(RadarError::Config(format!(
                "source '{}' has an unrecognized type",
                source.name
            ))),
        }?;

        // Parsers keep their own identity (the feed title); the configured
        // name only fills the gap.
        for article in &mut articles {
            if article.source.is_empty() {
                article.source = source.name.clone();
            }
        }
        Ok(articles)
    }

    async fn process_rss(&self, source: &Source) -> Result<Vec<Article>> {
        let content = self.fetcher.fetch(&source.url).await?;
        let options = FeedParseOptions {
            source_name: None,
            max_entries: Some(
                source
                    .max_articles
                    .unwrap_or(self.config.max_articles_per_source),
            ),
        };
        self.feed_parser.parse(&content, &options)
    }

    async fn process_html(&self, source: &Source) -> Result<Vec<Article>> {
        let content = self.fetcher.fetch(&source.url).await?;
        let options = HtmlParseOptions {
            source_url: source.url.clone(),
            source_name: Some(source.name.clone()),
            selector: source.selector.clone(),
            max_articles: Some(
                source
                    .max_articles
                    .unwrap_or(self.config.max_articles_per_source),
            ),
            field_selectors: source.field_selectors.clone(),
        };
        self.html_parser.parse(&content, &options)
    }

    /// Fan out over the feeds listed in an OPML document. Individual feed
    /// failures are logged and skipped.
    async fn process_opml(&self, source: &Source) -> Result<Vec<Article>> {
        let location = source
            .file_path
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.url.clone());
        if location.trim().is_empty() {
            return Err(RadarError::Config(format!(
                "OPML source '{}' has neither file_path nor url",
                source.name
            )));
        }

        let content = self.fetcher.fetch(&location).await?;
        let mut feeds = parse_opml(&content)?;
        let max_feeds = source.max_feeds.unwrap_or(DEFAULT_MAX_FEEDS);
        feeds.truncate(max_feeds);

        let per_feed = source
            .max_articles_per_feed
            .unwrap_or(DEFAULT_MAX_ARTICLES_PER_FEED);

        let mut collected = Vec::new();
        for feed in feeds {
            let options = FeedParseOptions {
                source_name: (feed.title != "Unknown").then(|| feed.title.clone()),
                max_entries: Some(per_feed),
            };
            let articles = match self.fetcher.fetch(&feed.url).await {
                Ok(content) => self.feed_parser.parse(&content, &options),
                Err(e) => Err(e),
            };
            match articles {
                Ok(articles) => collected.extend(articles),
                Err(e) => warn!("OPML feed '{}' failed: {}", feed.url, e),
            }
        }

        Ok(collected)
    }

    /// Fixed filter order: time, topic, then dedup when enabled. Output
    /// stays in arrival order.
    fn apply_filters(&self, articles: Vec<Article>) -> Vec<Article> {
        let time_filter = TimeFilter::new(self.config.update_interval_hours);
        let articles = time_filter.filter(articles);

        let articles = self
            .topic_filter
            .filter(articles, self.config.min_topic_score);

        if self.config.enable_deduplication {
            let mut dedup = DuplicateFilter::new(DuplicateOptions::default());
            return dedup.filter(articles);
        }
        articles
    }

    pub fn save_to_json(&self, articles: &[Article], path: &Path) -> Result<()> {
        JsonStorage::new(path).save(articles)
    }

    pub fn save_to_csv(&self, articles: &[Article], path: &Path) -> Result<()> {
        storage::export_csv(articles, path)
    }

    pub fn state(&self) -> Option<&StateStore> {
        self.state.as_ref()
    }
}

/// Strictly-after comparison used by incremental slicing. Undated articles
/// pass: discarding them would silently lose items whose feeds omit dates.
fn is_after(date: Option<DateTime<Utc>>, last_fetch: Option<DateTime<Utc>>) -> bool {
    match (date, last_fetch) {
        (Some(d), Some(cutoff)) => d > cutoff,
        _ => true,
    }
}
