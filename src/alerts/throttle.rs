//! Per-alert-type report throttling

use std::time::Duration;

use dashmap::DashMap;

/// Remembers when each alert type was last reported.
///
/// Owned by the orchestrator's [`BotState`](crate::orchestrator::BotState)
/// and handed to handlers, so independent instances never share timers.
#[derive(Debug, Default)]
pub struct ReportThrottle {
    last_reported: DashMap<String, i64>,
}

impl ReportThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true (and records `now`) if `key` was not reported within
    /// `min_interval` before `now`.
    pub fn should_report(&self, key: &str, now: i64, min_interval: Duration) -> bool {
        let interval_ms = i64::try_from(min_interval.as_millis()).unwrap_or(i64::MAX);
        let mut entry = self.last_reported.entry(key.to_string()).or_insert(i64::MIN);

        if *entry != i64::MIN && now.saturating_sub(*entry) < interval_ms {
            return false;
        }
        *entry = now;
        true
    }

    /// Last report time for `key` (unix millis)
    pub fn last_reported(&self, key: &str) -> Option<i64> {
        self.last_reported
            .get(key)
            .map(|t| *t)
            .filter(|&t| t != i64::MIN)
    }

    pub fn clear(&self, key: &str) {
        self.last_reported.remove(key);
    }
}
