use super::Event;
use super::clock::Clock;
use super::stats::SinkStats;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::error;

/// Thresholds governing when the buffer drains.
#[derive(Debug, Clone, Copy)]
pub struct BufferLimits {
    /// Drain once this many buffered payload bytes accumulate.
    pub byte_limit: usize,
    /// Drain once this many events accumulate.
    pub record_limit: usize,
    /// Events at or above this size are rejected outright.
    pub max_bytes: usize,
}

/// Thread-safe accumulator of pending events.
///
/// Arrival order is preserved in every drained snapshot. A store that trips
/// the record or byte threshold drains under the same critical section as
/// the append, so a batch can never be handed out twice.
pub struct EventBuffer {
    inner: Mutex<Inner>,
    limits: BufferLimits,
    // Published outside the mutex so the flush timer can poll it without
    // contending with stores.
    last_flush_millis: AtomicU64,
    clock: Clock,
    stats: Arc<SinkStats>,
}

struct Inner {
    events: Vec<Event>,
    byte_count: usize,
}

impl EventBuffer {
    pub fn new(limits: BufferLimits, clock: Clock, stats: Arc<SinkStats>) -> Self {
        let now = clock.now_millis();
        Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                byte_count: 0,
            }),
            limits,
            last_flush_millis: AtomicU64::new(now),
            clock,
            stats,
        }
    }

    /// Append one event. Returns the drained batch when this store tripped
    /// a threshold. Oversize payloads are dropped with an error log; the
    /// caller still sees success (fire-and-forget contract).
    pub fn store(&self, payload: Bytes, key: &str) -> Option<Vec<Event>> {
        let event = Event::new(payload, key);
        if event.size() >= self.limits.max_bytes {
            self.stats.record_oversized();
            error!(
                size = event.size(),
                limit = self.limits.max_bytes,
                "dropping event larger than the sink payload limit"
            );
            return None;
        }

        let mut inner = self.lock();
        inner.byte_count += event.size();
        inner.events.push(event);
        self.stats.record_stored();

        if inner.events.len() >= self.limits.record_limit
            || inner.byte_count >= self.limits.byte_limit
        {
            Some(self.drain(&mut inner))
        } else {
            None
        }
    }

    /// Drain everything buffered, in arrival order. An empty result means
    /// there was nothing pending.
    pub fn flush(&self) -> Vec<Event> {
        let mut inner = self.lock();
        self.drain(&mut inner)
    }

    /// Monotonic millis of the most recent drain, readable without the
    /// buffer mutex.
    pub fn last_flush_at(&self) -> u64 {
        self.last_flush_millis.load(Ordering::Acquire)
    }

    /// Current (record, byte) depth.
    pub fn depth(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.events.len(), inner.byte_count)
    }

    fn drain(&self, inner: &mut Inner) -> Vec<Event> {
        inner.byte_count = 0;
        self.last_flush_millis
            .store(self.clock.now_millis(), Ordering::Release);
        std::mem::take(&mut inner.events)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_buffer(byte_limit: usize, record_limit: usize, max_bytes: usize) -> EventBuffer {
        EventBuffer::new(
            BufferLimits {
                byte_limit,
                record_limit,
                max_bytes,
            },
            Clock::new(),
            Arc::new(SinkStats::default()),
        )
    }

    #[tokio::test]
    async fn record_limit_triggers_drain() {
        let buffer = make_buffer(usize::MAX, 3, 1000);

        assert!(buffer.store(Bytes::from_static(b"a"), "k").is_none());
        assert!(buffer.store(Bytes::from_static(b"bb"), "k").is_none());
        let batch = buffer.store(Bytes::from_static(b"ccc"), "k").unwrap();

        let payloads: Vec<&[u8]> = batch.iter().map(|e| e.payload.as_ref()).collect();
        assert_eq!(payloads, vec![b"a".as_ref(), b"bb".as_ref(), b"ccc".as_ref()]);
        assert_eq!(buffer.depth(), (0, 0));
    }

    #[tokio::test]
    async fn byte_limit_triggers_drain() {
        let buffer = make_buffer(10, usize::MAX, 1000);

        assert!(buffer.store(Bytes::from_static(b"12345"), "k").is_none());
        let batch = buffer.store(Bytes::from_static(b"6789012"), "k").unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(buffer.depth(), (0, 0));
    }

    #[tokio::test]
    async fn oversize_payload_is_rejected() {
        let stats = Arc::new(SinkStats::default());
        let buffer = EventBuffer::new(
            BufferLimits {
                byte_limit: usize::MAX,
                record_limit: usize::MAX,
                max_bytes: 100,
            },
            Clock::new(),
            Arc::clone(&stats),
        );

        let payload = Bytes::from(vec![0u8; 100]);
        assert!(buffer.store(payload, "k").is_none());
        assert_eq!(buffer.depth(), (0, 0));
        assert_eq!(stats.snapshot().oversized_events, 1);
    }

    #[tokio::test]
    async fn byte_count_matches_stored_payloads() {
        let buffer = make_buffer(usize::MAX, usize::MAX, 1000);

        buffer.store(Bytes::from_static(b"abc"), "k");
        buffer.store(Bytes::from_static(b"defgh"), "k");
        assert_eq!(buffer.depth(), (2, 8));

        let batch = buffer.flush();
        assert_eq!(batch.len(), 2);
        assert_eq!(buffer.depth(), (0, 0));
    }

    #[tokio::test]
    async fn flush_on_empty_buffer_returns_nothing() {
        let buffer = make_buffer(10, 10, 1000);
        assert!(buffer.flush().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_updates_last_flush_at() {
        let buffer = make_buffer(10, 10, 1000);
        assert_eq!(buffer.last_flush_at(), 0);

        tokio::time::advance(std::time::Duration::from_millis(700)).await;
        buffer.flush();
        assert_eq!(buffer.last_flush_at(), 700);
    }

    #[tokio::test]
    async fn thresholds_hold_after_every_store() {
        let buffer = make_buffer(64, 5, 1000);

        for i in 0..100u32 {
            buffer.store(Bytes::from(i.to_string().into_bytes()), "k");
            let (records, bytes) = buffer.depth();
            assert!(records < 5);
            assert!(bytes < 64);
        }
    }
}
