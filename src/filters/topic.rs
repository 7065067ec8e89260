//! Three-tier keyword relevance filter.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::types::{Article, RadarError, Result};

pub const DEFAULT_MIN_SCORE: f64 = 0.5;

const PRIMARY_SCORE: f64 = 1.0;
const SECONDARY_SCORE: f64 = 0.7;
const ALIAS_SCORE: f64 = 0.5;

/// Keyword tiers, usually loaded from a YAML document of the shape
/// `{primary: [...], secondary: [...], aliases: [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordSet {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl KeywordSet {
    /// Built-in AI/ML keyword set used when no file is configured.
    pub fn builtin() -> Self {
        fn owned(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            primary: owned(&[
                "artificial intelligence",
                "machine learning",
                "deep learning",
                "neural network",
                "natural language processing",
                "computer vision",
                "generative ai",
                "large language model",
                "llm",
            ]),
            secondary: owned(&[
                "chatgpt",
                "gpt",
                "openai",
                "anthropic",
                "claude",
                "hugging face",
                "transformer",
                "bert",
                "stable diffusion",
                "midjourney",
            ]),
            aliases: owned(&["ai", "ml", "ai/ml", "nlp", "cv"]),
        }
    }
}

struct CompiledKeyword {
    keyword: String,
    pattern: Regex,
}

/// Scores articles against keyword tiers; the first matching tier wins.
///
/// Primary scores 1.0, secondary 0.7, alias 0.5, no match 0.0. Scores are
/// never blended or accumulated across tiers.
pub struct TopicFilter {
    primary: Vec<CompiledKeyword>,
    secondary: Vec<CompiledKeyword>,
    aliases: Vec<CompiledKeyword>,
}

impl TopicFilter {
    pub fn new() -> Result<Self> {
        Self::with_keywords(KeywordSet::builtin())
    }

    pub fn with_keywords(keywords: KeywordSet) -> Result<Self> {
        let filter = Self {
            primary: compile_tier(&keywords.primary)?,
            secondary: compile_tier(&keywords.secondary)?,
            aliases: compile_tier(&keywords.aliases)?,
        };
        debug!(
            "topic filter initialized with {} primary keywords",
            filter.primary.len()
        );
        Ok(filter)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let keywords: KeywordSet = serde_yaml::from_str(&raw)
            .map_err(|e| RadarError::Config(format!("bad keywords file {}: {}", path.display(), e)))?;
        Self::with_keywords(keywords)
    }

    /// Relevance score over the article's title, description, and tags.
    pub fn score(&self, article: &Article) -> f64 {
        let text = searchable_text(article);
        if text.is_empty() {
            return 0.0;
        }

        for (tier, tier_score) in [
            (&self.primary, PRIMARY_SCORE),
            (&self.secondary, SECONDARY_SCORE),
            (&self.aliases, ALIAS_SCORE),
        ] {
            if tier.iter().any(|kw| kw.pattern.is_match(&text)) {
                return tier_score;
            }
        }

        0.0
    }

    /// Retain articles scoring at least `min_score`, attaching the score as
    /// a transient annotation.
    pub fn filter(&self, articles: Vec<Article>, min_score: f64) -> Vec<Article> {
        let total = articles.len();
        let filtered: Vec<Article> = articles
            .into_iter()
            .filter_map(|mut article| {
                let score = self.score(&article);
                if score >= min_score {
                    article.ai_score = Some(score);
                    Some(article)
                } else {
                    None
                }
            })
            .collect();

        info!(
            "topic filter: {}/{} articles passed (min_score={})",
            filtered.len(),
            total,
            min_score
        );
        filtered
    }

    /// All keywords matching the article, across every tier.
    pub fn matched_keywords(&self, article: &Article) -> Vec<String> {
        let text = searchable_text(article);
        if text.is_empty() {
            return Vec::new();
        }

        self.primary
            .iter()
            .chain(&self.secondary)
            .chain(&self.aliases)
            .filter(|kw| kw.pattern.is_match(&text))
            .map(|kw| kw.keyword.clone())
            .collect()
    }

    /// Sort by relevance, highest first, computing missing scores lazily.
    /// Ties keep their existing order.
    pub fn sort_by_relevance(&self, articles: &mut [Article]) {
        for article in articles.iter_mut() {
            if article.ai_score.is_none() {
                article.ai_score = Some(self.score(article));
            }
        }
        articles.sort_by(|a, b| {
            b.ai_score
                .unwrap_or(0.0)
                .partial_cmp(&a.ai_score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }
}

fn compile_tier(keywords: &[String]) -> Result<Vec<CompiledKeyword>> {
    keywords
        .iter()
        .map(|keyword| {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(&keyword.to_lowercase()));
            let pattern = Regex::new(&pattern)
                .map_err(|e| RadarError::Config(format!("bad keyword '{}': {}", keyword, e)))?;
            Ok(CompiledKeyword {
                keyword: keyword.clone(),
                pattern,
            })
        })
        .collect()
}

fn searchable_text(article: &Article) -> String {
    let mut parts = Vec::new();
    if !article.title.is_empty() {
        parts.push(article.title.clone());
    }
    if !article.description.is_empty() {
        parts.push(article.description.clone());
    }
    if !article.tags.is_empty() {
        parts.push(article.tags.join(" "));
    }
    parts.join(" ")
}
