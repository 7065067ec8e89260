//! Duplicate detection: removal mode with persistent seen-sets, and merge
//! mode collapsing near-identical articles by normalized URL.

use std::collections::{HashMap, HashSet};

use tracing::info;
use url::Url;

use crate::types::Article;

pub const DEFAULT_TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

const TRACKING_PARAMS: [&str; 4] = ["utm_source", "utm_medium", "utm_campaign", "ref"];

#[derive(Debug, Clone)]
pub struct DuplicateOptions {
    pub by_url: bool,
    pub by_title: bool,
    pub title_similarity_threshold: f64,
    pub by_content: bool,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            by_url: true,
            by_title: true,
            title_similarity_threshold: DEFAULT_TITLE_SIMILARITY_THRESHOLD,
            by_content: false,
        }
    }
}

/// Which member of a duplicate group survives a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePrefer {
    Newest,
    Oldest,
    First,
}

/// Stateful duplicate filter.
///
/// Seen URLs, lowercased titles, and content hashes persist across `filter`
/// calls until `reset`, so repeated invocations within one run keep
/// deduplicating against everything already kept.
pub struct DuplicateFilter {
    options: DuplicateOptions,
    seen_urls: HashSet<String>,
    seen_titles: HashSet<String>,
    seen_hashes: HashSet<String>,
}

impl DuplicateFilter {
    pub fn new(options: DuplicateOptions) -> Self {
        Self {
            options,
            seen_urls: HashSet::new(),
            seen_titles: HashSet::new(),
            seen_hashes: HashSet::new(),
        }
    }

    /// Drop any article matching a previously seen URL, title (exact or
    /// fuzzy), or content hash; track the survivors.
    pub fn filter(&mut self, articles: Vec<Article>) -> Vec<Article> {
        let total = articles.len();
        let mut kept = Vec::with_capacity(total);

        for article in articles {
            if self.is_duplicate(&article) {
                continue;
            }
            self.track(&article);
            kept.push(article);
        }

        info!(
            "duplicate filter: removed {} duplicates, kept {} unique articles",
            total - kept.len(),
            kept.len()
        );
        kept
    }

    fn is_duplicate(&self, article: &Article) -> bool {
        if self.options.by_url {
            let url = article.url.trim();
            if self.seen_urls.contains(url) {
                return true;
            }
        }

        if self.options.by_title {
            let title = article.title.trim().to_lowercase();
            if self.seen_titles.contains(&title) {
                return true;
            }
            for seen in &self.seen_titles {
                if similarity_ratio(&title, seen) >= self.options.title_similarity_threshold {
                    return true;
                }
            }
        }

        if self.options.by_content {
            if self.seen_hashes.contains(&content_hash(article)) {
                return true;
            }
        }

        false
    }

    fn track(&mut self, article: &Article) {
        if self.options.by_url {
            let url = article.url.trim();
            if !url.is_empty() {
                self.seen_urls.insert(url.to_string());
            }
        }
        if self.options.by_title {
            let title = article.title.trim().to_lowercase();
            if !title.is_empty() {
                self.seen_titles.insert(title);
            }
        }
        if self.options.by_content {
            self.seen_hashes.insert(content_hash(article));
        }
    }

    pub fn reset(&mut self) {
        self.seen_urls.clear();
        self.seen_titles.clear();
        self.seen_hashes.clear();
    }

    /// Merge duplicates instead of dropping them.
    ///
    /// Articles are grouped by normalized URL. Multi-member groups collapse
    /// onto the preferred member; empty description/tags/source fields on
    /// the base are filled from the other members, and the other members'
    /// source names are recorded in `duplicate_sources`.
    pub fn merge_duplicates(&self, articles: Vec<Article>, prefer: MergePrefer) -> Vec<Article> {
        let total = articles.len();

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<Article>> = HashMap::new();
        for article in articles {
            let key = normalize_url(&article.url);
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(article);
        }

        let mut merged = Vec::with_capacity(order.len());
        for key in order {
            let mut group = groups.remove(&key).unwrap_or_default();
            if group.len() == 1 {
                merged.push(group.pop().unwrap());
                continue;
            }

            match prefer {
                MergePrefer::Newest => group.sort_by(|a, b| b.date.cmp(&a.date)),
                MergePrefer::Oldest => group.sort_by(|a, b| a.date.cmp(&b.date)),
                MergePrefer::First => {}
            }

            let mut base = group[0].clone();
            for other in &group[1..] {
                if base.description.is_empty() && !other.description.is_empty() {
                    base.description = other.description.clone();
                }
                if base.tags.is_empty() && !other.tags.is_empty() {
                    base.tags = other.tags.clone();
                }
                if base.source.is_empty() && !other.source.is_empty() {
                    base.source = other.source.clone();
                }
            }

            let mut sources: Vec<String> = group
                .iter()
                .map(|a| a.source.clone())
                .filter(|s| !s.is_empty() && *s != base.source)
                .collect();
            sources.sort();
            sources.dedup();
            base.duplicate_sources = sources;

            merged.push(base);
        }

        info!(
            "merged {} articles into {} unique articles",
            total,
            merged.len()
        );
        merged
    }
}

/// MD5 over `title|description|source`, empty parts omitted.
fn content_hash(article: &Article) -> String {
    let parts: Vec<&str> = [
        article.title.as_str(),
        article.description.as_str(),
        article.source.as_str(),
    ]
    .into_iter()
    .filter(|p| !p.is_empty())
    .collect();

    format!("{:x}", md5::compute(parts.join("|")))
}

/// Lowercase the URL and strip common tracking query parameters.
fn normalize_url(url: &str) -> String {
    let lowered = url.trim().to_lowercase();
    let Ok(mut parsed) = Url::parse(&lowered) else {
        return lowered;
    };

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }

    parsed.to_string()
}

/// Sequence-similarity ratio over matching blocks (Ratcliff/Obershelp):
/// twice the number of matching characters divided by the total length.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Longest common substring, then recurse into the unmatched flanks.
    let mut best_a = 0;
    let mut best_b = 0;
    let mut best_len = 0;
    let mut prev = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                let run = prev[j] + 1;
                current[j + 1] = run;
                if run > best_len {
                    best_len = run;
                    best_a = i + 1 - run;
                    best_b = j + 1 - run;
                }
            }
        }
        prev = current;
    }

    if best_len == 0 {
        return 0;
    }

    best_len
        + matching_chars(&a[..best_a], &b[..best_b])
        + matching_chars(&a[best_a + best_len..], &b[best_b + best_len..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn article(title: &str, url: &str) -> Article {
        Article {
            title: title.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn similarity_ratio_values() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        // "ai news" (7) vs "ai news today" (13): 2 * 7 / 20
        let ratio = similarity_ratio("ai news", "ai news today");
        assert!((ratio - 0.7).abs() < 1e-9);
    }

    #[test]
    fn url_duplicates_keep_exactly_one() {
        let mut filter = DuplicateFilter::new(DuplicateOptions {
            by_title: false,
            ..Default::default()
        });
        let kept = filter.filter(vec![
            article("first title", "https://x/1"),
            article("completely different", "https://x/1"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "first title");
    }

    #[test]
    fn title_similarity_respects_threshold() {
        // similarity("ai news today", "ai news") = 0.7
        let make = || {
            vec![
                article("AI News Today", "https://x/a"),
                article("AI News", "https://x/b"),
            ]
        };

        let mut strict = DuplicateFilter::new(DuplicateOptions {
            title_similarity_threshold: 0.9,
            ..Default::default()
        });
        assert_eq!(strict.filter(make()).len(), 2);

        let mut loose = DuplicateFilter::new(DuplicateOptions {
            title_similarity_threshold: 0.5,
            ..Default::default()
        });
        assert_eq!(loose.filter(make()).len(), 1);
    }

    #[test]
    fn exact_title_match_ignores_case_only() {
        let mut filter = DuplicateFilter::new(DuplicateOptions {
            by_url: false,
            ..Default::default()
        });
        let kept = filter.filter(vec![
            article("AI Model Released", "https://x/a"),
            article("ai model released", "https://x/b"),
        ]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn prefixed_title_is_not_an_exact_duplicate() {
        // The full lowercased titles are compared; "Breaking:" is part of
        // the title, and the pair's similarity (~0.77) is under threshold.
        let mut filter = DuplicateFilter::new(DuplicateOptions {
            by_url: false,
            ..Default::default()
        });
        let kept = filter.filter(vec![
            article("Breaking: AI Model Released", "https://x/a"),
            article("AI Model Released", "https://x/b"),
        ]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn state_persists_across_calls_until_reset() {
        let mut filter = DuplicateFilter::new(DuplicateOptions::default());
        assert_eq!(filter.filter(vec![article("one", "https://x/1")]).len(), 1);
        assert_eq!(filter.filter(vec![article("one", "https://x/1")]).len(), 0);

        filter.reset();
        assert_eq!(filter.filter(vec![article("one", "https://x/1")]).len(), 1);
    }

    #[test]
    fn content_hash_duplicates() {
        let mut filter = DuplicateFilter::new(DuplicateOptions {
            by_url: false,
            by_title: false,
            by_content: true,
            ..Default::default()
        });
        let mut a = article("same", "https://x/1");
        a.description = "body".to_string();
        a.source = "src".to_string();
        let mut b = article("same", "https://x/2");
        b.description = "body".to_string();
        b.source = "src".to_string();

        assert_eq!(filter.filter(vec![a, b]).len(), 1);
    }

    #[test]
    fn merge_groups_by_normalized_url() {
        let filter = DuplicateFilter::new(DuplicateOptions::default());
        let a = article("story", "https://x/1?utm_source=feed");
        let b = article("story again", "https://x/1");
        let merged = filter.merge_duplicates(vec![a, b], MergePrefer::First);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "story");
    }

    #[test]
    fn merge_fills_empty_fields_and_records_sources() {
        let filter = DuplicateFilter::new(DuplicateOptions::default());
        let mut older = article("story", "https://x/1");
        older.date = Some(Utc::now() - Duration::hours(5));
        older.source = "Wire A".to_string();
        older.description = "full description".to_string();

        let mut newer = article("story updated", "https://x/1");
        newer.date = Some(Utc::now());
        newer.source = "Wire B".to_string();

        let merged = filter.merge_duplicates(vec![older, newer], MergePrefer::Newest);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "story updated");
        assert_eq!(merged[0].description, "full description");
        assert_eq!(merged[0].duplicate_sources, vec!["Wire A".to_string()]);
    }

    #[test]
    fn merge_prefer_oldest() {
        let filter = DuplicateFilter::new(DuplicateOptions::default());
        let mut old = article("old", "https://x/1");
        old.date = Some(Utc::now() - Duration::hours(5));
        let mut new = article("new", "https://x/1");
        new.date = Some(Utc::now());

        let merged = filter.merge_duplicates(vec![new, old], MergePrefer::Oldest);
        assert_eq!(merged[0].title, "old");
    }
}
