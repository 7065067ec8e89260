//! AI news aggregation: fetch configured RSS/Atom, HTML, and OPML sources,
//! filter by recency and topic relevance, deduplicate, and persist JSON
//! snapshots.

pub mod aggregator;
pub mod config;
pub mod fetcher;
pub mod filters;
pub mod parsers;
pub mod state;
pub mod storage;
pub mod types;
pub mod utils;

pub use aggregator::NewsRadar;
pub use config::RadarConfig;
pub use storage::JsonStorage;
pub use types::{Article, RadarError, Result, RunOutcome, RunStats, Source, SourceKind};
