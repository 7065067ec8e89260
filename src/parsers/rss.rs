//! RSS/Atom feed parsing plus OPML feed-list extraction.

use feed_rs::model::Entry;
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info};

use crate::types::{Article, FeedPointer, RadarError, Result};

#[derive(Debug, Clone, Default)]
pub struct FeedParseOptions {
    /// Overrides the feed's own title as the source name.
    pub source_name: Option<String>,
    /// Keep only the first N entries in feed order.
    pub max_entries: Option<usize>,
}

/// Parser for RSS 0.9/1.0/2.0 and Atom 0.3/1.0 feeds.
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw feed text into normalized articles.
    ///
    /// Empty input yields an empty list; structurally invalid XML is a parse
    /// error.
    pub fn parse(&self, content: &str, options: &FeedParseOptions) -> Result<Vec<Article>> {
        if content.trim().is_empty() {
            debug!("empty feed content");
            return Ok(Vec::new());
        }

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| RadarError::Parse(format!("failed to parse feed: {}", e)))?;

        let feed_title = feed
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty());
        // No fallback name here: an untitled feed leaves `source` empty and
        // the caller decides what to stamp it with.
        let source_name = options.source_name.clone().or(feed_title).unwrap_or_default();

        // Feeds are assumed reverse-chronological; the cap keeps the first N
        // in feed order without resorting.
        let entries: Vec<Entry> = match options.max_entries {
            Some(cap) => feed.entries.into_iter().take(cap).collect(),
            None => feed.entries.into_iter().collect(),
        };

        let articles: Vec<Article> = entries
            .into_iter()
            .filter_map(|entry| parse_entry(entry, &source_name))
            .collect();

        info!("parsed {} articles from {}", articles.len(), source_name);
        Ok(super::normalize(articles, &source_name))
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_entry(entry: Entry, source_name: &str) -> Option<Article> {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let url = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();
    if title.trim().is_empty() || url.trim().is_empty() {
        debug!("skipping feed entry without title or link");
        return None;
    }

    let description = entry.summary.map(|s| s.content).unwrap_or_default();

    // Structured time fields only; no free-text date parsing here.
    let date = entry.published.or(entry.updated);

    let author = entry
        .authors
        .first()
        .map(|a| a.name.clone())
        .filter(|n| !n.trim().is_empty());

    let tags: Vec<String> = entry
        .categories
        .into_iter()
        .map(|c| c.term)
        .filter(|t| !t.is_empty())
        .collect();

    let image_url = extract_image(&entry.media);

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

/// Media thumbnail first, then an image-typed enclosure.
fn extract_image(media: &[feed_rs::model::MediaObject]) -> Option<String> {
    for object in media {
        if let Some(thumbnail) = object.thumbnails.first() {
            return Some(thumbnail.image.uri.clone());
        }
    }

    for object in media {
        for content in &object.content {
            let is_image = content
                .content_type
                .as_ref()
                .map(|mime| mime.to_string().starts_with("image/"))
                .unwrap_or(false);
            if is_image {
                if let Some(url) = &content.url {
                    return Some(url.to_string());
                }
            }
        }
    }

    None
}

/// Extract feed pointers from an OPML document.
///
/// Only outline elements carrying an `xmlUrl` attribute count; everything
/// else (folders, comments) is skipped. This never produces articles — the
/// aggregator fans out over the returned feeds.
pub fn parse_opml(content: &str) -> Result<Vec<FeedPointer>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() != b"outline" {
                    continue;
                }

                let xml_url = e
                    .try_get_attribute("xmlUrl")
                    .map_err(|err| RadarError::Parse(format!("bad outline attribute: {}", err)))?
                    .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()));

                let Some(url) = xml_url.filter(|u| !u.trim().is_empty()) else {
                    continue;
                };

                let title = ["title", "text"]
                    .iter()
                    .find_map(|name| {
                        e.try_get_attribute(*name)
                            .ok()
                            .flatten()
                            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
                            .filter(|t| !t.trim().is_empty())
                    })
                    .unwrap_or_else(|| "Unknown".to_string());

                feeds.push(FeedPointer { title, url });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RadarError::Parse(format!(
                    "failed to parse OPML at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    info!("found {} feeds in OPML document", feeds.len());
    Ok(feeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Tech Wire</title>
    <item>
      <title>New machine learning benchmark released</title>
      <link>https://example.com/ml-benchmark</link>
      <description>A benchmark for evaluating models.</description>
      <pubDate>Sat, 01 Mar 2025 10:00:00 GMT</pubDate>
      <category>ml</category>
      <media:thumbnail url="https://example.com/thumb.jpg"/>
    </item>
    <item>
      <title>Second story</title>
      <link>https://example.com/second</link>
    </item>
    <item>
      <title>Third story</title>
      <link>https://example.com/third</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_entries_with_metadata() {
        let parser = FeedParser::new();
        let articles = parser.parse(SAMPLE_RSS, &FeedParseOptions::default()).unwrap();
        assert_eq!(articles.len(), 3);

        let first = &articles[0];
        assert_eq!(first.title, "New machine learning benchmark released");
        assert_eq!(first.url, "https://example.com/ml-benchmark");
        assert_eq!(first.source, "Tech Wire");
        assert_eq!(first.tags, vec!["ml".to_string()]);
        assert_eq!(first.image_url.as_deref(), Some("https://example.com/thumb.jpg"));
        assert!(first.date.is_some());
        assert_eq!(first.language, "en");
    }

    #[test]
    fn max_entries_keeps_first_n_in_feed_order() {
        let parser = FeedParser::new();
        let options = FeedParseOptions {
            max_entries: Some(2),
            ..Default::default()
        };
        let articles = parser.parse(SAMPLE_RSS, &options).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].url, "https://example.com/ml-benchmark");
        assert_eq!(articles[1].url, "https://example.com/second");
    }

    #[test]
    fn source_name_override_wins() {
        let parser = FeedParser::new();
        let options = FeedParseOptions {
            source_name: Some("Custom".to_string()),
            ..Default::default()
        };
        let articles = parser.parse(SAMPLE_RSS, &options).unwrap();
        assert!(articles.iter().all(|a| a.source == "Custom"));
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let parser = FeedParser::new();
        assert!(parser.parse("", &FeedParseOptions::default()).unwrap().is_empty());
        assert!(parser.parse("   \n", &FeedParseOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        let parser = FeedParser::new();
        let err = parser.parse("this is not xml at all", &FeedParseOptions::default());
        assert!(matches!(err, Err(RadarError::Parse(_))));
    }

    #[test]
    fn opml_extracts_feeds_with_xml_url() {
        let opml = r#"<?xml version="1.0"?>
<opml version="2.0">
  <body>
    <outline text="Folder">
      <outline type="rss" text="AI Blog" xmlUrl="https://example.com/ai.xml"/>
      <outline type="rss" title="ML Weekly" xmlUrl="https://example.com/ml.xml"/>
      <outline text="not a feed"/>
    </outline>
  </body>
</opml>"#;

        let feeds = parse_opml(opml).unwrap();
        assert_eq!(feeds.len(), 2);
        assert_eq!(feeds[0].title, "AI Blog");
        assert_eq!(feeds[0].url, "https://example.com/ai.xml");
        assert_eq!(feeds[1].title, "ML Weekly");
    }
}
