pub mod backoff;
pub mod buffer;
pub mod clock;
pub mod coordinator;
pub mod fallback;
pub mod primary;
pub mod scheduler;
pub mod stats;

pub use buffer::{BufferLimits, EventBuffer};
pub use coordinator::{InitError, KinesisSink};
pub use stats::{SinkStats, StatsSnapshot};

use async_trait::async_trait;
use bytes::Bytes;

/// Largest payload accepted when events can only reach the primary stream.
pub const MAX_BYTES_PRIMARY: usize = 1_000_000;

/// Largest payload accepted when a fallback queue is configured. The queue
/// caps message bodies at 256 000 bytes and the spillover path base64-encodes
/// payloads, so the raw limit is 256 000 * 3 / 4.
pub const MAX_BYTES_FALLBACK: usize = 192_000;

/// An opaque payload plus the partition key it should land under.
///
/// The key doubles as the `kinesisKey` message attribute when the event is
/// spilled to the fallback queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub payload: Bytes,
    pub key: String,
}

impl Event {
    pub fn new(payload: impl Into<Bytes>, key: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            key: key.into(),
        }
    }

    /// Payload size in bytes; the partition key does not count toward the
    /// buffer limits.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// The surface the HTTP layer drives.
///
/// `store_raw_events` is fire-and-forget: delivery errors are absorbed by
/// the sink and never surface to the caller. The returned list is always
/// empty; it exists for symmetry with sinks that reject synchronously.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Payload ceiling, readable so callers can short-circuit oversize
    /// requests before they reach the buffer.
    fn max_bytes(&self) -> usize;

    fn store_raw_events(&self, payloads: Vec<Bytes>, key: &str) -> Vec<Bytes>;

    /// Delivery counter snapshot, so the hosting process can watch sink
    /// health without reaching for the concrete type.
    fn stats(&self) -> StatsSnapshot;

    /// Final drain. Blocks until pending events are handed to the
    /// submitters and in-flight tasks finish or the grace period expires.
    async fn shutdown(&self);
}
