//! Concurrency-safe finding accumulator

use parking_lot::Mutex;

use super::record::AlertRecord;

/// Append-many / drain-once collection of alert records.
///
/// Every operation takes the same lock, so a batch passed to [`append`] is
/// either fully visible to a [`drain`] or not at all. Batches are collected
/// before the lock is taken; the critical section only moves records.
///
/// [`append`]: SharedBuffer::append
/// [`drain`]: SharedBuffer::drain
#[derive(Debug, Default)]
pub struct SharedBuffer {
    records: Mutex<Vec<AlertRecord>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a batch of records atomically, preserving batch order
    pub fn append<I>(&self, records: I)
    where
        I: IntoIterator<Item = AlertRecord>,
    {
        let mut batch: Vec<AlertRecord> = records.into_iter().collect();
        if batch.is_empty() {
            return;
        }

        let mut guard = self.records.lock();
        guard.append(&mut batch);
    }

    /// Append a single record
    pub fn push(&self, record: AlertRecord) {
        self.records.lock().push(record);
    }

    /// Take everything appended since the previous drain
    pub fn drain(&self) -> Vec<AlertRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Number of records waiting for the next drain
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
