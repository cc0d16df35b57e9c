//! Sliding-window health monitor
//!
//! Converts a stream of error-kind records into a healthy/unhealthy signal.
//! Evaluation is call-driven: the window is only pruned when [`HealthMonitor::check`]
//! (or [`HealthMonitor::check_at`]) runs, so a host that stops calling it keeps
//! the last verdict.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::record::AlertRecord;

/// Health monitor construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthConfigError {
    #[error("max errors in window must be at least 1")]
    ZeroMaxErrors,

    #[error("window duration must be non-zero")]
    ZeroWindow,

    #[error("window duration {0:?} does not fit in i64 milliseconds")]
    WindowTooLarge(Duration),
}

#[derive(Debug, Default)]
struct HealthWindow {
    /// Error timestamps (unix millis), kept sorted ascending
    error_timestamps: VecDeque<i64>,
    /// Count inside the window at the last evaluation
    errors_in_window: usize,
    last_checked: Option<i64>,
}

/// Sliding time window of observed errors
#[derive(Debug)]
pub struct HealthMonitor {
    border_duration: Duration,
    border_ms: i64,
    max_errors_in_window: usize,
    window: Mutex<HealthWindow>,
}

impl HealthMonitor {
    /// Create a monitor; fails on a zero threshold or an empty window
    pub fn new(
        border_duration: Duration,
        max_errors_in_window: usize,
    ) -> Result<Self, HealthConfigError> {
        if max_errors_in_window == 0 {
            return Err(HealthConfigError::ZeroMaxErrors);
        }
        if border_duration.is_zero() {
            return Err(HealthConfigError::ZeroWindow);
        }
        let border_ms = i64::try_from(border_duration.as_millis())
            .map_err(|_| HealthConfigError::WindowTooLarge(border_duration))?;

        Ok(Self {
            border_duration,
            border_ms,
            max_errors_in_window,
            window: Mutex::new(HealthWindow::default()),
        })
    }

    pub fn border_duration(&self) -> Duration {
        self.border_duration
    }

    pub fn max_errors_in_window(&self) -> usize {
        self.max_errors_in_window
    }

    /// Record errors from `records` at the current wall-clock time
    pub fn check(&self, records: &[AlertRecord]) -> usize {
        self.check_at(records, chrono::Utc::now().timestamp_millis())
    }

    /// Record one error timestamp per error-kind record at `now`, prune
    /// everything older than `now - border_duration` and return the count of
    /// errors inside `[now - border_duration, now]`.
    pub fn check_at(&self, records: &[AlertRecord], now: i64) -> usize {
        let new_errors = records.iter().filter(|r| r.is_error()).count();

        let mut window = self.window.lock();
        let was_healthy = window.errors_in_window < self.max_errors_in_window;

        if new_errors > 0 {
            // Out-of-order ticks still land in sorted position
            let at = window.error_timestamps.partition_point(|&t| t <= now);
            for _ in 0..new_errors {
                window.error_timestamps.insert(at, now);
            }
        }

        let cutoff = now.saturating_sub(self.border_ms);
        while window
            .error_timestamps
            .front()
            .is_some_and(|&t| t < cutoff)
        {
            window.error_timestamps.pop_front();
        }

        let count = window.error_timestamps.partition_point(|&t| t <= now);
        window.errors_in_window = count;
        window.last_checked = Some(now);

        let healthy = count < self.max_errors_in_window;
        if was_healthy && !healthy {
            tracing::warn!(
                errors_in_window = count,
                max_errors = self.max_errors_in_window,
                window_ms = self.border_ms,
                "Health check failed: too many errors in window"
            );
        } else if !was_healthy && healthy {
            tracing::info!(errors_in_window = count, "Health recovered");
        }

        count
    }

    /// True iff the error count at the last evaluation is below the threshold
    pub fn is_healthy(&self) -> bool {
        self.window.lock().errors_in_window < self.max_errors_in_window
    }

    /// Error count at the last evaluation
    pub fn errors_in_window(&self) -> usize {
        self.window.lock().errors_in_window
    }

    pub fn snapshot(&self) -> HealthStatus {
        let window = self.window.lock();
        HealthStatus {
            healthy: window.errors_in_window < self.max_errors_in_window,
            errors_in_window: window.errors_in_window,
            max_errors_in_window: self.max_errors_in_window,
            window_ms: self.border_ms,
            last_checked: window.last_checked,
        }
    }
}

/// Point-in-time view of a monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub errors_in_window: usize,
    pub max_errors_in_window: usize,
    pub window_ms: i64,
    /// Last evaluation time (unix millis)
    pub last_checked: Option<i64>,
}
