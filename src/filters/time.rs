//! Time-window filter.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::types::Article;

/// Keeps articles published inside a rolling window ending now.
///
/// Articles without a date are dropped here. (The aggregator's incremental
/// time-slicing deliberately does the opposite and retains them; the two
/// call sites have different ambiguity policies.)
pub struct TimeFilter {
    hours: i64,
    cutoff: DateTime<Utc>,
}

impl TimeFilter {
    pub fn new(hours: i64) -> Self {
        Self {
            hours,
            cutoff: Utc::now() - Duration::hours(hours),
        }
    }

    pub fn filter(&self, articles: Vec<Article>) -> Vec<Article> {
        let total = articles.len();
        let filtered: Vec<Article> = articles
            .into_iter()
            .filter(|a| self.is_within_window(a.date))
            .collect();

        info!(
            "time filter: {}/{} articles within last {} hours",
            filtered.len(),
            total,
            self.hours
        );
        filtered
    }

    pub fn is_within_window(&self, date: Option<DateTime<Utc>>) -> bool {
        match date {
            Some(d) => d >= self.cutoff,
            None => false,
        }
    }

    /// Recompute the cutoff from the current wall clock.
    pub fn update_window(&mut self, hours: i64) {
        self.hours = hours;
        self.cutoff = Utc::now() - Duration::hours(hours);
        debug!("time window updated to last {} hours", hours);
    }

    pub fn cutoff_time(&self) -> DateTime<Utc> {
        self.cutoff
    }
}
