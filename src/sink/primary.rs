use super::Event;
use super::backoff::Backoff;
use super::fallback::FallbackSubmitter;
use super::scheduler::Scheduler;
use super::stats::SinkStats;
use crate::client::StreamClient;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Submits flushed batches to the primary stream.
///
/// A whole-call failure fails every event in the batch; a bulk response
/// with partial failures fails exactly the rejected subset. Failed events
/// spill to the fallback queue when one is configured, otherwise they are
/// rescheduled with full-jitter backoff. Without a fallback the retry set
/// is unbounded; the fallback queue is the mitigation for memory growth
/// during long outages.
pub struct PrimarySubmitter {
    client: Arc<dyn StreamClient>,
    stream_name: String,
    scheduler: Scheduler,
    backoff: Backoff,
    fallback: Option<Arc<FallbackSubmitter>>,
    stats: Arc<SinkStats>,
}

impl PrimarySubmitter {
    pub fn new(
        client: Arc<dyn StreamClient>,
        stream_name: String,
        scheduler: Scheduler,
        backoff: Backoff,
        fallback: Option<Arc<FallbackSubmitter>>,
        stats: Arc<SinkStats>,
    ) -> Self {
        Self {
            client,
            stream_name,
            scheduler,
            backoff,
            fallback,
            stats,
        }
    }

    /// Fire-and-forget entry point for a freshly flushed batch.
    pub fn submit(self: &Arc<Self>, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        self.stats.record_flush();
        let this = Arc::clone(self);
        let initial = self.backoff.initial();
        self.scheduler.spawn(this.send_batch(events, initial));
    }

    fn send_batch(
        self: Arc<Self>,
        events: Vec<Event>,
        last_backoff: u64,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let total = events.len();
            match self.client.put_records(&self.stream_name, &events).await {
                Ok(results) => {
                    let failures: Vec<Event> = events
                        .into_iter()
                        .zip(results.iter())
                        .filter(|(_, result)| result.is_failed())
                        .map(|(event, _)| event)
                        .collect();

                    if failures.is_empty() {
                        self.stats.record_delivered(total as u64);
                        debug!(stream = %self.stream_name, count = total, "batch delivered");
                        return;
                    }

                    // One sampled code/message keeps the log volume bounded
                    // on large rejected batches.
                    let sample = results.iter().find(|result| result.is_failed());
                    error!(
                        stream = %self.stream_name,
                        failed = failures.len(),
                        total,
                        code = sample.and_then(|r| r.error_code.as_deref()),
                        message = sample.and_then(|r| r.error_message.as_deref()),
                        "records rejected by the primary stream"
                    );
                    self.stats.record_delivered((total - failures.len()) as u64);
                    self.handle_failures(failures, last_backoff);
                }
                Err(err) => {
                    error!(
                        stream = %self.stream_name,
                        count = total,
                        error = %err,
                        "bulk put failed, whole batch considered undelivered"
                    );
                    self.handle_failures(events, last_backoff);
                }
            }
        })
    }

    /// Failed events go to the fallback queue when one is configured,
    /// otherwise they are rescheduled. The wait uses the pre-increment
    /// backoff and the retry carries the incremented value forward, so the
    /// first retry of a batch lands after `minBackoff`.
    fn handle_failures(self: &Arc<Self>, failures: Vec<Event>, last_backoff: u64) {
        match &self.fallback {
            Some(fallback) => fallback.submit(failures),
            None => {
                let next_backoff = self.backoff.next(last_backoff);
                self.stats.record_retried(failures.len() as u64);
                let this = Arc::clone(self);
                self.scheduler.schedule_after(
                    Duration::from_millis(last_backoff),
                    this.send_batch(failures, next_backoff),
                );
            }
        }
    }
}
