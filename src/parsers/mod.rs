//! Source parsers: adapters from raw feed or page text to normalized
//! [`Article`](crate::types::Article) records.

mod html;
mod rss;

pub use html::{HtmlParseOptions, HtmlParser};
pub use rss::{parse_opml, FeedParseOptions, FeedParser};

use tracing::warn;

use crate::types::Article;
use crate::utils::text::clean_text;

/// Shared normalization contract applied by every parser.
///
/// Trims title/url/description, defaults the source to `fallback_source`
/// when absent, defaults the language to `"en"`, and drops any article that
/// ends up without a title or url. Empty optional fields are cleared so they
/// are omitted from serialized output.
pub fn normalize(articles: Vec<Article>, fallback_source: &str) -> Vec<Article> {
    let mut normalized = Vec::with_capacity(articles.len());

    for mut article in articles {
        article.title = clean_text(&article.title);
        article.url = article.url.trim().to_string();
        article.description = clean_text(&article.description);

        if article.source.trim().is_empty() {
            article.source = fallback_source.to_string();
        }
        if article.language.trim().is_empty() {
            article.language = "en".to_string();
        }

        article.author = article.author.filter(|a| !a.trim().is_empty());
        article.image_url = article.image_url.filter(|u| !u.trim().is_empty());
        article.bilingual_title = article.bilingual_title.filter(|t| !t.trim().is_empty());
        article.tags.retain(|t| !t.trim().is_empty());

        if article.is_valid() {
            normalized.push(article);
        } else {
            warn!(
                "skipping article missing required fields: title='{}' url='{}'",
                article.title, article.url
            );
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_defaults() {
        let articles = vec![Article {
            title: "  Hello  ".to_string(),
            url: " https://example.com/a ".to_string(),
            description: "  desc ".to_string(),
            language: String::new(),
            ..Default::default()
        }];

        let out = normalize(articles, "My Feed");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "Hello");
        assert_eq!(out[0].url, "https://example.com/a");
        assert_eq!(out[0].description, "desc");
        assert_eq!(out[0].source, "My Feed");
        assert_eq!(out[0].language, "en");
    }

    #[test]
    fn normalize_drops_invalid_articles() {
        let articles = vec![
            Article {
                title: "   ".to_string(),
                url: "https://example.com/a".to_string(),
                ..Default::default()
            },
            Article {
                title: "ok".to_string(),
                url: "  ".to_string(),
                ..Default::default()
            },
        ];
        assert!(normalize(articles, "feed").is_empty());
    }

    #[test]
    fn normalize_clears_empty_optionals() {
        let articles = vec![Article {
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            author: Some("  ".to_string()),
            tags: vec!["ai".to_string(), " ".to_string()],
            ..Default::default()
        }];
        let out = normalize(articles, "feed");
        assert!(out[0].author.is_none());
        assert_eq!(out[0].tags, vec!["ai".to_string()]);
    }

    #[test]
    fn normalize_keeps_explicit_source() {
        let articles = vec![Article {
            title: "t".to_string(),
            url: "https://example.com".to_string(),
            source: "Upstream".to_string(),
            ..Default::default()
        }];
        assert_eq!(normalize(articles, "fallback")[0].source, "Upstream");
    }
}
