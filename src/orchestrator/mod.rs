//! Per-tick orchestration
//!
//! Fans handlers out for each tick, collects their records through the
//! shared buffer and feeds the drained batch to the health monitor.

pub mod handler;
pub mod host;
pub mod runner;

pub use handler::{
    BotState, FnHandler, Handler, HandlerError, HandlerFuture, HandlerResult, Tick, TickContext,
    TickKind,
};
pub use host::{TickLoop, TickLoopError};
pub use runner::{Orchestrator, TickOutcome, TickReport, TickStats};
