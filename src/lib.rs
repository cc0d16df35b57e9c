//! Watchtower: shared primitives for chain monitoring bots
//!
//! Bots that watch blocks and transactions keep rebuilding the same three
//! pieces; this crate provides them once, domain-agnostic.
//!
//! # Features
//!
//! - **SharedBuffer**: concurrent append, single drain per tick, no loss
//! - **HealthMonitor**: sliding time window of errors behind a healthy flag
//! - **ThresholdLadder**: one alert per upward crossing of a percentage ladder
//! - **Orchestrator**: concurrent handler fan-out with single-flight ticks
//! - **Health probe**: `/health` and `/stats` over HTTP
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use watchtower::alerts::{HealthMonitor, LadderLevel, Rounding, Severity, ThresholdLadder};
//! use watchtower::orchestrator::{FnHandler, HandlerResult, Orchestrator, Tick, TickContext};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ladder = std::sync::Arc::new(ThresholdLadder::new(
//!     "QUORUM",
//!     "Quorum support",
//!     Rounding::Down,
//!     vec![
//!         LadderLevel::new(50, Severity::Medium),
//!         LadderLevel::new(100, Severity::Critical),
//!     ],
//! )?);
//!
//! let orchestrator = Orchestrator::new(HealthMonitor::new(Duration::from_secs(3600), 5)?)
//!     .with_handler(FnHandler::new("quorum", move |ctx: TickContext| {
//!         let ladder = ladder.clone();
//!         async move {
//!             let outcome = ctx.state.levels.observe(
//!                 &ladder,
//!                 "proposal-7",
//!                 420.0,
//!                 800.0,
//!                 ctx.tick.timestamp,
//!             );
//!             HandlerResult::Ok(outcome.alert.into_iter().collect())
//!         }
//!     }));
//!
//! let records = orchestrator.on_tick(Tick::block(19_000_000, 0)).await.into_records();
//! println!("{} records, healthy: {}", records.len(), orchestrator.is_healthy());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod orchestrator;
pub mod telemetry;

// Re-export commonly used types
pub use alerts::{AlertKind, AlertRecord, HealthMonitor, Severity, SharedBuffer, ThresholdLadder};
pub use config::{ConfigError, WatchtowerConfig};
pub use orchestrator::{Orchestrator, Tick, TickOutcome};
