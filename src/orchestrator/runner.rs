//! Per-tick fan-out / fan-in

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinSet;

use super::handler::{BotState, Handler, HandlerError, HandlerResult, Tick, TickContext};
use crate::alerts::{AlertRecord, HealthMonitor, HealthStatus, SharedBuffer};

/// Result of one completed tick
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: Tick,
    /// Everything appended during the tick, drained exactly once
    pub records: Vec<AlertRecord>,
    /// Handlers that returned an error, panicked or timed out
    pub handler_failures: usize,
    pub errors_in_window: usize,
    pub healthy: bool,
}

#[derive(Debug, Clone)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick still held the tick token
    Skipped { tick: Tick },
}

impl TickOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TickOutcome::Completed(report) => Some(report),
            TickOutcome::Skipped { .. } => None,
        }
    }

    pub fn into_records(self) -> Vec<AlertRecord> {
        match self {
            TickOutcome::Completed(report) => report.records,
            TickOutcome::Skipped { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct TickCounters {
    completed: AtomicU64,
    skipped: AtomicU64,
    records: AtomicU64,
    handler_failures: AtomicU64,
}

/// Tick counters
#[derive(Debug, Clone, Serialize)]
pub struct TickStats {
    pub ticks_completed: u64,
    pub ticks_skipped: u64,
    pub records_emitted: u64,
    pub handler_failures: u64,
}

/// Runs the registered handlers for every tick.
///
/// Handlers for one tick run as concurrent tasks; their output goes through
/// the shared buffer, which is drained once after all of them finish. The
/// drained batch is fed to the health monitor before it is returned.
pub struct Orchestrator {
    handlers: Vec<Arc<dyn Handler>>,
    buffer: Arc<SharedBuffer>,
    health: Arc<HealthMonitor>,
    state: Arc<BotState>,
    handler_timeout: Option<Duration>,
    /// Held for the duration of a tick; overlapping ticks fail to acquire it
    tick_token: tokio::sync::Mutex<()>,
    counters: TickCounters,
}

impl Orchestrator {
    pub fn new(health: HealthMonitor) -> Self {
        Self {
            handlers: Vec::new(),
            buffer: Arc::new(SharedBuffer::new()),
            health: Arc::new(health),
            state: Arc::new(BotState::new()),
            handler_timeout: None,
            tick_token: tokio::sync::Mutex::new(()),
            counters: TickCounters::default(),
        }
    }

    /// Register a handler
    pub fn with_handler(mut self, handler: impl Handler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Abandon handlers that run longer than `timeout`
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    /// Use externally created state, e.g. restored from a checkpoint
    pub fn with_state(mut self, state: Arc<BotState>) -> Self {
        self.state = state;
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub fn buffer(&self) -> &Arc<SharedBuffer> {
        &self.buffer
    }

    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    pub fn health(&self) -> HealthStatus {
        self.health.snapshot()
    }

    pub fn stats(&self) -> TickStats {
        TickStats {
            ticks_completed: self.counters.completed.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
            records_emitted: self.counters.records.load(Ordering::Relaxed),
            handler_failures: self.counters.handler_failures.load(Ordering::Relaxed),
        }
    }

    /// Run every handler for `tick` and return the combined records.
    ///
    /// Dropping the returned future aborts the handler tasks; whatever they
    /// already appended stays in the buffer for the next drain.
    pub async fn on_tick(&self, tick: Tick) -> TickOutcome {
        let Ok(_token) = self.tick_token.try_lock() else {
            self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(tick = tick.number, "Previous tick still running, skipping");
            return TickOutcome::Skipped { tick };
        };

        let mut tasks = JoinSet::new();
        for handler in &self.handlers {
            let handler = Arc::clone(handler);
            let ctx = TickContext {
                tick,
                state: Arc::clone(&self.state),
                buffer: Arc::clone(&self.buffer),
            };
            let timeout = self.handler_timeout;

            tasks.spawn(async move {
                let result = run_handler(handler.as_ref(), ctx.clone(), timeout).await;
                match result {
                    Ok(records) => {
                        ctx.buffer.append(records);
                        true
                    }
                    Err(e) => {
                        tracing::warn!(
                            tick = tick.number,
                            handler = %handler.name(),
                            error = %e,
                            "Handler failed"
                        );
                        ctx.buffer.push(AlertRecord::error_at(
                            handler.name(),
                            e.to_string(),
                            tick.timestamp,
                        ));
                        false
                    }
                }
            });
        }

        let mut failures = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => failures += 1,
                Err(e) => {
                    failures += 1;
                    tracing::error!(tick = tick.number, error = %e, "Handler task failed");
                    self.buffer.push(AlertRecord::error_at(
                        "orchestrator",
                        e.to_string(),
                        tick.timestamp,
                    ));
                }
            }
        }

        let records = self.buffer.drain();
        let errors_in_window = self.health.check_at(&records, tick.timestamp);
        let healthy = self.health.is_healthy();

        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .records
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        self.counters
            .handler_failures
            .fetch_add(failures as u64, Ordering::Relaxed);

        tracing::debug!(
            tick = tick.number,
            records = records.len(),
            failures,
            errors_in_window,
            healthy,
            "Tick completed"
        );

        TickOutcome::Completed(TickReport {
            tick,
            records,
            handler_failures: failures,
            errors_in_window,
            healthy,
        })
    }
}

/// Run one handler, mapping panics and timeouts into errors
async fn run_handler(
    handler: &dyn Handler,
    ctx: TickContext,
    timeout: Option<Duration>,
) -> HandlerResult {
    let fut = AssertUnwindSafe(async move { handler.handle(ctx).await }).catch_unwind();

    let caught = match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| HandlerError::Timeout(limit))?,
        None => fut.await,
    };

    caught.unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
