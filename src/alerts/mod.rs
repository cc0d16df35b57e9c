//! Alert primitives shared by monitoring bots
//!
//! Provides the concurrent finding buffer, the sliding-window health
//! monitor, threshold-ladder evaluation and the delivery seam.

pub mod buffer;
pub mod health;
pub mod ladder;
pub mod record;
pub mod sink;
pub mod throttle;
pub mod tracker;

pub use buffer::SharedBuffer;
pub use health::{HealthConfigError, HealthMonitor, HealthStatus};
pub use ladder::{LadderError, LadderLevel, LadderOutcome, Rounding, ThresholdLadder};
pub use record::{AlertKind, AlertRecord, Severity};
pub use sink::{AlertSink, LogSink, MemorySink, SinkError};
pub use throttle::ReportThrottle;
pub use tracker::LevelTracker;
