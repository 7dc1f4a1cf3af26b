use std::sync::atomic::{AtomicU64, Ordering};

/// Cheap delivery counters kept by the sink.
///
/// This is not a metrics endpoint; the hosting process can poll `snapshot`
/// and export the numbers however it likes.
#[derive(Debug, Default)]
pub struct SinkStats {
    stored_events: AtomicU64,
    oversized_events: AtomicU64,
    batches_flushed: AtomicU64,
    records_delivered: AtomicU64,
    records_retried: AtomicU64,
    fallback_records: AtomicU64,
    dropped_records: AtomicU64,
}

impl SinkStats {
    pub fn record_stored(&self) {
        self.stored_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.oversized_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flush(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, count: u64) {
        self.records_delivered.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_retried(&self, count: u64) {
        self.records_retried.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_fallback(&self, count: u64) {
        self.fallback_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_dropped(&self, count: u64) {
        self.dropped_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            stored_events: self.stored_events.load(Ordering::Relaxed),
            oversized_events: self.oversized_events.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            records_retried: self.records_retried.load(Ordering::Relaxed),
            fallback_records: self.fallback_records.load(Ordering::Relaxed),
            dropped_records: self.dropped_records.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub stored_events: u64,
    pub oversized_events: u64,
    pub batches_flushed: u64,
    pub records_delivered: u64,
    pub records_retried: u64,
    pub fallback_records: u64,
    pub dropped_records: u64,
}
