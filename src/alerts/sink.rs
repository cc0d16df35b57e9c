//! Delivery seam for drained records

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::record::{AlertKind, AlertRecord};

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Sink closed")]
    Closed,
}

/// Consumer of the per-tick record batch.
///
/// The transport and its wire format live outside this crate; implementors
/// only receive the complete batch for a tick.
pub trait AlertSink: Send + Sync {
    fn deliver<'a>(&'a self, records: &'a [AlertRecord]) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Writes every record to tracing
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }

    fn log_record(record: &AlertRecord) {
        match record.kind {
            AlertKind::Finding => {
                tracing::warn!(
                    alert_id = %record.alert_id,
                    severity = %record.severity,
                    timestamp = record.timestamp,
                    "Alert: {} - {}",
                    record.name,
                    record.description
                );
            }
            AlertKind::Error => {
                tracing::error!(
                    alert_id = %record.alert_id,
                    timestamp = record.timestamp,
                    "Internal error: {}",
                    record.description
                );
            }
        }
    }
}

impl AlertSink for LogSink {
    fn deliver<'a>(&'a self, records: &'a [AlertRecord]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            for record in records {
                Self::log_record(record);
            }
            Ok(())
        })
    }
}

/// Keeps delivered records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<AlertRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything delivered so far
    pub fn take(&self) -> Vec<AlertRecord> {
        std::mem::take(&mut *self.delivered.lock())
    }

    pub fn len(&self) -> usize {
        self.delivered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.delivered.lock().is_empty()
    }
}

impl AlertSink for MemorySink {
    fn deliver<'a>(&'a self, records: &'a [AlertRecord]) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.delivered.lock().extend_from_slice(records);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_accepts_everything() {
        let sink = LogSink::new();
        let records = vec![
            AlertRecord::finding_at("A", "a", 0),
            AlertRecord::error_at("rpc", "boom", 0),
        ];
        assert!(tokio_test::block_on(sink.deliver(&records)).is_ok());
    }

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.deliver(&[AlertRecord::finding_at("A", "a", 0)])
            .await
            .unwrap();
        sink.deliver(&[AlertRecord::finding_at("B", "b", 1)])
            .await
            .unwrap();

        assert_eq!(sink.len(), 2);
        let taken = sink.take();
        assert_eq!(taken[0].alert_id, "A");
        assert_eq!(taken[1].alert_id, "B");
        assert!(sink.is_empty());
    }
}
