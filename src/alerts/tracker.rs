//! Per-metric storage of the last alerted ladder level

use std::collections::HashMap;

use dashmap::DashMap;

use super::ladder::{LadderOutcome, ThresholdLadder};

/// Holds `last_alerted_level` for every tracked metric.
///
/// The ladder stays pure; this is the caller-side half that stores the
/// returned level and applies the reset rule: an observation with
/// `total <= 0` or `support <= 0` stores level 0.
#[derive(Debug, Default)]
pub struct LevelTracker {
    levels: DashMap<String, u32>,
}

impl LevelTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate and store the new level in one step.
    ///
    /// The metric's entry stays locked for the whole evaluation, so two
    /// concurrent observations of the same metric cannot both fire for the
    /// same level.
    pub fn observe(
        &self,
        ladder: &ThresholdLadder,
        metric: &str,
        support: f64,
        total: f64,
        timestamp: i64,
    ) -> LadderOutcome {
        let mut entry = self.levels.entry(metric.to_string()).or_insert(0);
        let last = *entry;
        let outcome = ladder.evaluate(support, total, last, timestamp);

        let stored = if total <= 0.0 || support <= 0.0 {
            0
        } else {
            outcome.triggered_level
        };

        if stored != last {
            tracing::debug!(
                metric = %metric,
                from = last,
                to = stored,
                "Ladder level updated"
            );
        }
        *entry = stored;

        outcome
    }

    /// Stored level for `metric` (0 when never observed)
    pub fn get(&self, metric: &str) -> u32 {
        self.levels.get(metric).map(|l| *l).unwrap_or(0)
    }

    /// Overwrite the stored level, e.g. when restoring a host checkpoint
    pub fn set(&self, metric: &str, level: u32) {
        self.levels.insert(metric.to_string(), level);
    }

    /// Forget `metric`; returns its last level
    pub fn reset(&self, metric: &str) -> Option<u32> {
        self.levels.remove(metric).map(|(_, level)| level)
    }

    /// Copy of all stored levels, suitable for checkpointing
    pub fn snapshot(&self) -> HashMap<String, u32> {
        self.levels
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::ladder::{LadderLevel, Rounding};
    use crate::alerts::record::Severity;
    use std::sync::Arc;

    fn ladder() -> ThresholdLadder {
        ThresholdLadder::new(
            "SUPPORT",
            "Support",
            Rounding::Down,
            vec![
                LadderLevel::new(30, Severity::Info),
                LadderLevel::new(50, Severity::Low),
                LadderLevel::new(100, Severity::Critical),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_observe_tracks_levels_per_metric() {
        let tracker = LevelTracker::new();
        let ladder = ladder();

        assert!(tracker.observe(&ladder, "p1", 35.0, 100.0, 0).alert.is_some());
        assert!(tracker.observe(&ladder, "p1", 40.0, 100.0, 0).alert.is_none());
        assert!(tracker.observe(&ladder, "p2", 40.0, 100.0, 0).alert.is_some());

        assert_eq!(tracker.get("p1"), 30);
        assert_eq!(tracker.get("p2"), 30);
        assert_eq!(tracker.get("unknown"), 0);
    }

    #[test]
    fn test_reset_on_degenerate_observation() {
        let tracker = LevelTracker::new();
        let ladder = ladder();

        tracker.observe(&ladder, "p", 60.0, 100.0, 0);
        assert_eq!(tracker.get("p"), 50);

        // Falling alone does not clear the level
        tracker.observe(&ladder, "p", 10.0, 100.0, 0);
        assert_eq!(tracker.get("p"), 50);

        let out = tracker.observe(&ladder, "p", 10.0, 0.0, 0);
        assert!(out.alert.is_none());
        assert_eq!(tracker.get("p"), 0);

        // After the reset the same crossing fires again
        assert!(tracker.observe(&ladder, "p", 60.0, 100.0, 0).alert.is_some());

        tracker.observe(&ladder, "p", 0.0, 100.0, 0);
        assert_eq!(tracker.get("p"), 0);
    }

    #[test]
    fn test_set_and_snapshot() {
        let tracker = LevelTracker::new();
        tracker.set("p", 50);
        assert!(tracker.observe(&ladder(), "p", 60.0, 100.0, 0).alert.is_none());
        assert_eq!(tracker.snapshot().get("p"), Some(&50));
        assert_eq!(tracker.reset("p"), Some(50));
        assert_eq!(tracker.get("p"), 0);
    }

    #[test]
    fn test_concurrent_observers_fire_once() {
        let tracker = Arc::new(LevelTracker::new());
        let ladder = Arc::new(ladder());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let ladder = Arc::clone(&ladder);
                std::thread::spawn(move || {
                    tracker
                        .observe(&ladder, "p", 55.0, 100.0, 0)
                        .alert
                        .is_some() as usize
                })
            })
            .collect();

        let fired: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(fired, 1);
    }
}
