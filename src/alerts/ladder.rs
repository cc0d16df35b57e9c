//! Monotonic threshold-crossing alerts
//!
//! A ladder turns a continuously changing ratio (support / total) into one
//! alert per upward level crossing. The ladder itself holds no per-metric
//! state: the caller passes the last alerted level in and stores the
//! returned one, so a single ladder can back any number of metrics.

use serde::{Deserialize, Serialize};

use super::record::{AlertRecord, Severity};

/// How the percentage is rounded before it is compared against the levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Compare the raw ratio
    #[default]
    Exact,
    /// Floor to a whole percent
    Down,
    /// Ceil to a whole percent
    Up,
}

impl Rounding {
    fn apply(self, percent: f64) -> f64 {
        match self {
            Rounding::Exact => percent,
            Rounding::Down => percent.floor(),
            Rounding::Up => percent.ceil(),
        }
    }
}

/// A single break-point of a ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderLevel {
    /// Percentage in `1..=100`
    pub threshold: u32,
    pub severity: Severity,
}

impl LadderLevel {
    pub fn new(threshold: u32, severity: Severity) -> Self {
        Self {
            threshold,
            severity,
        }
    }
}

/// Ladder construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LadderError {
    #[error("ladder has no levels")]
    Empty,

    #[error("level {0} is outside 1..=100")]
    OutOfRange(u32),

    #[error("levels must be strictly ascending: {next} follows {previous}")]
    NotAscending { previous: u32, next: u32 },
}

/// Result of one ladder evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct LadderOutcome {
    /// Set only when a level above `last_alerted_level` was reached
    pub alert: Option<AlertRecord>,
    /// Level to store for the next evaluation
    pub triggered_level: u32,
}

/// Ascending sequence of percentage levels with a severity each
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdLadder {
    alert_id: String,
    name: String,
    rounding: Rounding,
    levels: Vec<LadderLevel>,
}

impl ThresholdLadder {
    /// Build a ladder; levels must be non-empty, strictly ascending and in `1..=100`
    pub fn new(
        alert_id: impl Into<String>,
        name: impl Into<String>,
        rounding: Rounding,
        levels: Vec<LadderLevel>,
    ) -> Result<Self, LadderError> {
        if levels.is_empty() {
            return Err(LadderError::Empty);
        }

        for level in &levels {
            if level.threshold == 0 || level.threshold > 100 {
                return Err(LadderError::OutOfRange(level.threshold));
            }
        }

        for pair in levels.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                return Err(LadderError::NotAscending {
                    previous: pair[0].threshold,
                    next: pair[1].threshold,
                });
            }
        }

        Ok(Self {
            alert_id: alert_id.into(),
            name: name.into(),
            rounding,
            levels,
        })
    }

    pub fn alert_id(&self) -> &str {
        &self.alert_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn levels(&self) -> &[LadderLevel] {
        &self.levels
    }

    /// `100 * support / total` under the ladder's rounding, `None` when `total <= 0`
    pub fn percent(&self, support: f64, total: f64) -> Option<f64> {
        if total.is_nan() || total <= 0.0 {
            return None;
        }
        Some(self.rounding.apply(100.0 * support / total))
    }

    /// Highest level reached by `percent`; an exact boundary counts as reached
    pub fn level_for(&self, percent: f64) -> Option<&LadderLevel> {
        self.levels
            .iter()
            .rev()
            .find(|level| percent >= f64::from(level.threshold))
    }

    /// Evaluate one observation.
    ///
    /// `timestamp` stamps the alert; the same arguments always give the same
    /// outcome.
    pub fn evaluate(
        &self,
        support: f64,
        total: f64,
        last_alerted_level: u32,
        timestamp: i64,
    ) -> LadderOutcome {
        let unchanged = LadderOutcome {
            alert: None,
            triggered_level: last_alerted_level,
        };

        let Some(percent) = self.percent(support, total) else {
            return unchanged;
        };

        let Some(level) = self.level_for(percent) else {
            return unchanged;
        };

        if level.threshold <= last_alerted_level {
            return unchanged;
        }

        let record = AlertRecord::finding_at(
            format!("{}-{}", self.alert_id, level.threshold),
            format!("{} reached {}%", self.name, level.threshold),
            timestamp,
        )
        .with_severity(level.severity)
        .with_description(format!(
            "{} is at {:.2}% ({} of {}), crossing the {}% level",
            self.name, percent, support, total, level.threshold
        ))
        .with_metadata("thresholdLevelChecked", level.threshold)
        .with_metadata("lastAlertedLevelBefore", last_alerted_level)
        .with_metadata("percent", format!("{:.2}", percent))
        .with_metadata("support", support)
        .with_metadata("total", total);

        LadderOutcome {
            alert: Some(record),
            triggered_level: level.threshold,
        }
    }
}
