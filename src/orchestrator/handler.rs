//! Handler seam and per-tick context

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::alerts::{AlertRecord, LevelTracker, ReportThrottle, SharedBuffer};

/// What triggered a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Block,
    Transaction,
}

/// One invocation cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Block number or transaction sequence
    pub number: u64,
    /// Tick time (unix millis)
    pub timestamp: i64,
    pub kind: TickKind,
}

impl Tick {
    pub fn block(number: u64, timestamp: i64) -> Self {
        Self {
            number,
            timestamp,
            kind: TickKind::Block,
        }
    }

    pub fn transaction(number: u64, timestamp: i64) -> Self {
        Self {
            number,
            timestamp,
            kind: TickKind::Transaction,
        }
    }
}

/// State that survives between ticks, owned by the orchestrator and
/// threaded into every handler call.
#[derive(Debug, Default)]
pub struct BotState {
    /// Last alerted ladder level per metric
    pub levels: LevelTracker,
    /// Last report time per alert type
    pub throttle: ReportThrottle,
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Everything a handler receives for one tick
#[derive(Debug, Clone)]
pub struct TickContext {
    pub tick: Tick,
    pub state: Arc<BotState>,
    /// Direct access for handlers that emit records before they return
    pub buffer: Arc<SharedBuffer>,
}

/// Handler failures; each becomes an error-kind record
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Panicked: {0}")]
    Panicked(String),
}

pub type HandlerResult = Result<Vec<AlertRecord>, HandlerError>;

pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// Per-bot business logic invoked once per tick
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    fn handle(&self, ctx: TickContext) -> HandlerFuture;
}

/// Adapts a closure returning a future into a [`Handler`]
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(TickContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, ctx: TickContext) -> HandlerFuture {
        Box::pin((self.f)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_handler() {
        let handler = FnHandler::new("echo", |ctx: TickContext| async move {
            HandlerResult::Ok(vec![AlertRecord::finding_at(
                "ECHO",
                format!("tick {}", ctx.tick.number),
                ctx.tick.timestamp,
            )])
        });

        let ctx = TickContext {
            tick: Tick::block(7, 1_000),
            state: Arc::new(BotState::new()),
            buffer: Arc::new(SharedBuffer::new()),
        };

        assert_eq!(handler.name(), "echo");
        let records = handler.handle(ctx).await.unwrap();
        assert_eq!(records[0].name, "tick 7");
        assert_eq!(records[0].timestamp, 1_000);
    }

    #[test]
    fn test_tick_constructors() {
        assert_eq!(Tick::block(1, 2).kind, TickKind::Block);
        assert_eq!(Tick::transaction(1, 2).kind, TickKind::Transaction);
    }
}
