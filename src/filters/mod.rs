//! Filter chain stages: time window, topic relevance, duplicate removal.

pub mod duplicate;
pub mod time;
pub mod topic;

pub use duplicate::{DuplicateFilter, DuplicateOptions, MergePrefer};
pub use time::TimeFilter;
pub use topic::{KeywordSet, TopicFilter, DEFAULT_MIN_SCORE};
