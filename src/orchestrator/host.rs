//! Timer-driven tick loop

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use super::handler::Tick;
use super::runner::{Orchestrator, TickOutcome};
use crate::alerts::AlertSink;

/// Tick loop construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickLoopError {
    #[error("tick period must be non-zero")]
    ZeroPeriod,
}

/// Calls [`Orchestrator::on_tick`] on a fixed interval and delivers the
/// records of every completed tick to a sink.
///
/// Hosts that receive blocks from a chain subscription call `on_tick`
/// directly instead.
pub struct TickLoop {
    orchestrator: Arc<Orchestrator>,
    sink: Arc<dyn AlertSink>,
    period: Duration,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl TickLoop {
    /// Create a loop; fails on a zero period
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        sink: Arc<dyn AlertSink>,
        period: Duration,
    ) -> Result<Self, TickLoopError> {
        if period.is_zero() {
            return Err(TickLoopError::ZeroPeriod);
        }

        Ok(Self {
            orchestrator,
            sink,
            period,
            shutdown_tx: None,
        })
    }

    /// Start the background loop
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        self.shutdown_tx = Some(shutdown_tx);

        let orchestrator = Arc::clone(&self.orchestrator);
        let sink = Arc::clone(&self.sink);
        let period = self.period;

        tokio::spawn(async move {
            tracing::info!("Tick loop started with interval {:?}", period);

            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut number = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        number += 1;
                        let tick = Tick::block(number, chrono::Utc::now().timestamp_millis());
                        Self::run_tick(&orchestrator, sink.as_ref(), tick).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Tick loop shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Stop the background loop
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    async fn run_tick(orchestrator: &Orchestrator, sink: &dyn AlertSink, tick: Tick) {
        let records = match orchestrator.on_tick(tick).await {
            TickOutcome::Completed(report) => report.records,
            TickOutcome::Skipped { .. } => return,
        };

        if records.is_empty() {
            return;
        }

        if let Err(e) = sink.deliver(&records).await {
            tracing::error!(
                tick = tick.number,
                records = records.len(),
                error = %e,
                "Failed to deliver records"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertRecord, HealthMonitor, MemorySink};
    use crate::orchestrator::{FnHandler, HandlerResult, TickContext};

    #[tokio::test]
    async fn test_loop_delivers_and_stops() {
        let orchestrator = Arc::new(
            Orchestrator::new(HealthMonitor::new(Duration::from_secs(1), 3).unwrap()).with_handler(
                FnHandler::new("beat", |ctx: TickContext| async move {
                    HandlerResult::Ok(vec![AlertRecord::finding_at(
                        "BEAT",
                        "heartbeat",
                        ctx.tick.timestamp,
                    )])
                }),
            ),
        );
        let sink = Arc::new(MemorySink::new());

        let mut tick_loop = TickLoop::new(
            Arc::clone(&orchestrator),
            sink.clone(),
            Duration::from_millis(10),
        )
        .unwrap();
        let handle = tick_loop.start();

        tokio::time::sleep(Duration::from_millis(100)).await;
        tick_loop.stop().await;
        handle.await.unwrap();

        let delivered = sink.len() as u64;
        assert!(delivered >= 2);
        assert_eq!(orchestrator.stats().records_emitted, delivered);
    }

    #[test]
    fn test_zero_period_rejected() {
        let orchestrator = Arc::new(Orchestrator::new(
            HealthMonitor::new(Duration::from_secs(1), 3).unwrap(),
        ));
        let result = TickLoop::new(orchestrator, Arc::new(MemorySink::new()), Duration::ZERO);
        assert!(matches!(result, Err(TickLoopError::ZeroPeriod)));
    }
}
