//! CSS-selector driven article extraction from HTML pages.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};
use url::Url;

use crate::types::{Article, RadarError, Result};
use crate::utils::date::parse_date;

// Fallback selector chains tried when no custom selector is configured.
const DEFAULT_ELEMENT_SELECTOR: &str = "article";
const DEFAULT_TITLE_SELECTOR: &str = "h2, h3, .title, [class*='title']";
const DEFAULT_LINK_SELECTOR: &str = "a[href]";
const DEFAULT_DESCRIPTION_SELECTOR: &str = "p, .desc, .description, .summary";
const DEFAULT_DATE_SELECTOR: &str = ".date, time, [datetime], [class*='date']";
const DEFAULT_AUTHOR_SELECTOR: &str = ".author, [class*='author']";
const DEFAULT_TAG_SELECTOR: &str = ".tag, .category, [class*='tag']";

#[derive(Debug, Clone, Default)]
pub struct HtmlParseOptions {
    /// Base URL of the page, used to resolve relative links and images.
    pub source_url: String,
    pub source_name: Option<String>,
    /// CSS selector matching one element per article.
    pub selector: Option<String>,
    /// Cap applied to the element list before per-element parsing, so it
    /// bounds work rather than just output size.
    pub max_articles: Option<usize>,
    /// Per-field selector overrides, keyed by
    /// title/link/description/date/author/tags.
    pub field_selectors: HashMap<String, String>,
}

/// Parser for article listings on HTML pages.
pub struct HtmlParser;

impl HtmlParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, content: &str, options: &HtmlParseOptions) -> Result<Vec<Article>> {
        let source_name = options
            .source_name
            .clone()
            .unwrap_or_else(|| "HTML Source".to_string());

        let element_selector = compile(
            options
                .selector
                .as_deref()
                .unwrap_or(DEFAULT_ELEMENT_SELECTOR),
        )?;
        let fields = FieldSelectors::from_options(&options.field_selectors)?;

        let document = Html::parse_document(content);
        let mut elements: Vec<ElementRef> = document.select(&element_selector).collect();
        if elements.is_empty() {
            debug!("no article elements matched selector");
            return Ok(Vec::new());
        }
        if let Some(cap) = options.max_articles {
            elements.truncate(cap);
        }

        let articles: Vec<Article> = elements
            .into_iter()
            .filter_map(|element| {
                parse_article_element(element, &options.source_url, &source_name, &fields)
            })
            .collect();

        info!("parsed {} articles from {}", articles.len(), source_name);
        Ok(super::normalize(articles, &source_name))
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

struct FieldSelectors {
    title: Selector,
    link: Selector,
    description: Selector,
    date: Selector,
    author: Selector,
    tags: Selector,
    image: Selector,
    background: Selector,
}

impl FieldSelectors {
    fn from_options(overrides: &HashMap<String, String>) -> Result<Self> {
        let pick = |key: &str, fallback: &str| -> Result<Selector> {
            compile(overrides.get(key).map(String::as_str).unwrap_or(fallback))
        };

        Ok(Self {
            title: pick("title", DEFAULT_TITLE_SELECTOR)?,
            link: pick("link", DEFAULT_LINK_SELECTOR)?,
            description: pick("description", DEFAULT_DESCRIPTION_SELECTOR)?,
            date: pick("date", DEFAULT_DATE_SELECTOR)?,
            author: pick("author", DEFAULT_AUTHOR_SELECTOR)?,
            tags: pick("tags", DEFAULT_TAG_SELECTOR)?,
            image: compile("img[src]")?,
            background: compile("[style*='background-image']")?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| RadarError::Parse(format!("invalid CSS selector '{}': {}", selector, e)))
}

fn parse_article_element(
    element: ElementRef,
    base_url: &str,
    source_name: &str,
    fields: &FieldSelectors,
) -> Option<Article> {
    let title = element
        .select(&fields.title)
        .next()
        .map(element_text)
        .unwrap_or_default();
    if title.is_empty() {
        debug!("skipping element without a resolvable title");
        return None;
    }

    let href = element
        .select(&fields.link)
        .next()
        .and_then(|el| el.value().attr("href"))
        .unwrap_or_default();
    let url = resolve_url(base_url, href);
    if url.is_empty() {
        debug!("skipping element without a resolvable link");
        return None;
    }

    let description = element
        .select(&fields.description)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let date = parse_element_date(&element, fields);

    let author = element
        .select(&fields.author)
        .next()
        .map(element_text)
        .filter(|a| !a.is_empty());

    let tags: Vec<String> = element
        .select(&fields.tags)
        .map(|el| element_text(el))
        .filter(|t| !t.is_empty())
        .collect();

    let image_url = parse_element_image(&element, base_url, fields);

    Some(Article {
        title,
        url,
        description,
        date,
        source: source_name.to_string(),
        language: "en".to_string(),
        author,
        tags,
        image_url,
        ..Default::default()
    })
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn resolve_url(base_url: &str, href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    match Url::parse(base_url) {
        Ok(base) => base
            .join(href)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        Err(_) => href.to_string(),
    }
}

/// `datetime`/`content` attributes take priority over element text.
fn parse_element_date(
    element: &ElementRef,
    fields: &FieldSelectors,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let date_el = element.select(&fields.date).next()?;

    let attr_value = date_el
        .value()
        .attr("datetime")
        .or_else(|| date_el.value().attr("content"));

    let raw = match attr_value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => element_text(date_el),
    };

    parse_date(&raw)
}

/// `img src`/`data-src` first, then inline `background-image` CSS.
fn parse_element_image(
    element: &ElementRef,
    base_url: &str,
    fields: &FieldSelectors,
) -> Option<String> {
    if let Some(img) = element.select(&fields.image).next() {
        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"));
        if let Some(src) = src.filter(|s| !s.trim().is_empty()) {
            return Some(resolve_url(base_url, src));
        }
    }

    for styled in element.select(&fields.background) {
        let style = styled.value().attr("style").unwrap_or_default();
        if let Some(start) = style.find("url(") {
            let rest = &style[start + 4..];
            if let Some(end) = rest.find(')') {
                let raw = rest[..end].trim_matches(|c| c == '"' || c == '\'' || c == ' ');
                if !raw.is_empty() {
                    return Some(resolve_url(base_url, raw));
                }
            }
        }
    }

    None
}
