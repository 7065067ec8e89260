//! Timestamp parsing and formatting helpers.
//!
//! All dates in the pipeline are canonical UTC. Free-text date strings from
//! feeds and pages go through `parse_date`, which degrades to `None` rather
//! than failing.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Parse a free-text date string into a UTC timestamp.
///
/// Tries RFC 3339 and RFC 2822 first (the forms feeds actually emit), then
/// falls back to the general `dateparser` heuristics. Naive dates are
/// treated as UTC. Returns `None` on anything unparsable.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    match dateparser::parse(value) {
        Ok(dt) => Some(dt),
        Err(e) => {
            debug!("could not parse date string '{}': {}", value, e);
            None
        }
    }
}

/// Format a timestamp as ISO-8601 (RFC 3339).
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339()
}

/// Whether a timestamp falls inside the last `hours` hours.
pub fn is_recent(date: &DateTime<Utc>, hours: i64) -> bool {
    *date >= Utc::now() - Duration::hours(hours)
}
