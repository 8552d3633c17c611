use chrono::{DateTime, Utc};
use serde::Serialize;

/// Summary of one pass over the feed list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub feeds_checked: usize,
    pub feeds_failed: usize,
    pub links_examined: usize,
    pub new_links: usize,
    pub notify_failures: usize,
    pub record_failures: usize,
}

impl CycleReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            feeds_checked: 0,
            feeds_failed: 0,
            links_examined: 0,
            new_links: 0,
            notify_failures: 0,
            record_failures: 0,
        }
    }

    /// True when every feed was fetched and every new link was delivered and stored.
    pub fn is_clean(&self) -> bool {
        self.feeds_failed == 0 && self.notify_failures == 0 && self.record_failures == 0
    }

    /// Format: "{checked} feeds ({failed} failed), {new} new links"
    pub fn summary(&self) -> String {
        let mut message = format!(
            "{} feeds ({} failed), {} new links",
            self.feeds_checked, self.feeds_failed, self.new_links
        );

        if self.notify_failures > 0 {
            message.push_str(&format!(", {} notify failures", self.notify_failures));
        }

        if self.record_failures > 0 {
            message.push_str(&format!(", {} record failures", self.record_failures));
        }

        message
    }
}

impl Default for CycleReport {
    fn default() -> Self {
        Self::new()
    }
}
