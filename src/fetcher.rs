//! Content retrieval for sources.
//!
//! Fetching is a thin, replaceable seam: the aggregator only needs
//! `fetch(url) -> raw text`. Tests substitute a canned implementation so the
//! pipeline can run without a network.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::types::{RadarError, Result};

/// Retrieval of raw source text by URL or local path.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub proxy: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-radar/1.0".to_string(),
            timeout_secs: 30,
            proxy: None,
        }
    }
}

/// HTTP fetcher backed by reqwest. Requests are bounded by a per-request
/// timeout; there is no retry logic — the next scheduled run is the retry
/// mechanism.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .deflate(true)
            .brotli(true);

        if let Some(proxy) = &config.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        // OPML sources may point at a local file instead of a URL.
        if !url.starts_with("http://") && !url.starts_with("https://") {
            let path = url.strip_prefix("file://").unwrap_or(url);
            debug!("reading local file: {}", path);
            return Ok(tokio::fs::read_to_string(Path::new(path)).await?);
        }

        debug!("fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RadarError::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
