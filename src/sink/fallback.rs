use super::Event;
use super::scheduler::Scheduler;
use super::stats::SinkStats;
use crate::client::{QueueClient, QueueMessage};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error};
use uuid::Uuid;

/// The fallback queue accepts at most this many entries per batch send.
const MAX_QUEUE_BATCH: usize = 10;

/// Spillover path for events the primary stream rejected.
///
/// This is the last resort: its purpose is to bound collector memory, so
/// events that fail here are logged and dropped rather than re-retried.
pub struct FallbackSubmitter {
    client: Arc<dyn QueueClient>,
    queue_name: String,
    // Resolved lazily so a queue that appears after startup still works.
    queue_url: OnceCell<String>,
    scheduler: Scheduler,
    stats: Arc<SinkStats>,
}

impl FallbackSubmitter {
    pub fn new(
        client: Arc<dyn QueueClient>,
        queue_name: String,
        scheduler: Scheduler,
        stats: Arc<SinkStats>,
    ) -> Self {
        Self {
            client,
            queue_name,
            queue_url: OnceCell::new(),
            scheduler,
            stats,
        }
    }

    /// Startup availability probe. Failure is logged by the caller; the
    /// submitter stays usable and re-resolves the queue on first use.
    pub async fn check_queue(&self) -> bool {
        self.resolve_queue_url().await.is_ok()
    }

    /// Fire-and-forget spillover of a failed batch.
    pub fn submit(self: &Arc<Self>, events: Vec<Event>) {
        if events.is_empty() {
            return;
        }
        let this = Arc::clone(self);
        self.scheduler
            .spawn(async move { this.put_to_fallback(events).await });
    }

    async fn put_to_fallback(&self, events: Vec<Event>) {
        let queue_url = match self.resolve_queue_url().await {
            Ok(url) => url.clone(),
            Err(()) => {
                self.stats.record_dropped(events.len() as u64);
                error!(
                    queue = %self.queue_name,
                    count = events.len(),
                    "dropping records, fallback queue is unavailable"
                );
                return;
            }
        };

        for group in events.chunks(MAX_QUEUE_BATCH) {
            let entries: Vec<QueueMessage> = group
                .iter()
                .map(|event| QueueMessage {
                    id: Uuid::new_v4().to_string(),
                    body: STANDARD.encode(&event.payload),
                    key: event.key.clone(),
                })
                .collect();
            let sent = entries.len();

            match self.client.send_message_batch(&queue_url, entries).await {
                Ok(outcome) if outcome.failed.is_empty() => {
                    self.stats.record_fallback(sent as u64);
                    debug!(queue = %self.queue_name, count = sent, "records spilled to fallback queue");
                }
                Ok(outcome) => {
                    let failed = outcome.failed.len();
                    let first = &outcome.failed[0];
                    self.stats.record_fallback((sent - failed) as u64);
                    self.stats.record_dropped(failed as u64);
                    error!(
                        queue = %self.queue_name,
                        failed,
                        total = sent,
                        code = %first.code,
                        sender_fault = first.sender_fault,
                        "dropping records rejected by the fallback queue"
                    );
                }
                Err(err) => {
                    self.stats.record_dropped(sent as u64);
                    error!(
                        queue = %self.queue_name,
                        count = sent,
                        error = %err,
                        "dropping records, fallback queue send failed"
                    );
                }
            }
        }
    }

    async fn resolve_queue_url(&self) -> Result<&String, ()> {
        self.queue_url
            .get_or_try_init(|| async {
                self.client
                    .get_queue_url(&self.queue_name)
                    .await
                    .map_err(|err| {
                        error!(queue = %self.queue_name, error = %err, "fallback queue lookup failed");
                    })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{BatchEntryFailure, BatchSendOutcome, MockQueueClient};
    use bytes::Bytes;
    use mockall::predicate::eq;

    fn make_submitter(client: MockQueueClient) -> (Arc<FallbackSubmitter>, Scheduler) {
        let scheduler = Scheduler::new(2);
        let submitter = Arc::new(FallbackSubmitter::new(
            Arc::new(client),
            "spill-queue".to_string(),
            scheduler.clone(),
            Arc::new(SinkStats::default()),
        ));
        (submitter, scheduler)
    }

    fn make_events(count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| Event::new(Bytes::from(format!("payload-{i}")), "key"))
            .collect()
    }

    #[tokio::test]
    async fn batches_are_capped_at_ten_entries() {
        let mut client = MockQueueClient::new();
        client
            .expect_get_queue_url()
            .return_once(|_| Ok("http://queue".to_string()));

        let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&sizes);
        client
            .expect_send_message_batch()
            .times(3)
            .returning(move |_, entries| {
                recorded.lock().unwrap().push(entries.len());
                Ok(BatchSendOutcome {
                    successful: entries.len(),
                    failed: Vec::new(),
                })
            });

        let (submitter, scheduler) = make_submitter(client);
        submitter.submit(make_events(23));
        assert!(scheduler.shutdown(std::time::Duration::from_secs(5)).await);

        assert_eq!(*sizes.lock().unwrap(), vec![10, 10, 3]);
    }

    #[tokio::test]
    async fn bodies_are_base64_with_key_attribute() {
        let mut client = MockQueueClient::new();
        client
            .expect_get_queue_url()
            .with(eq("spill-queue"))
            .return_once(|_| Ok("http://queue".to_string()));
        client
            .expect_send_message_batch()
            .withf(|url, entries| {
                url == "http://queue"
                    && entries.len() == 1
                    && entries[0].body == STANDARD.encode(b"payload-0")
                    && entries[0].key == "key"
                    && !entries[0].id.is_empty()
            })
            .return_once(|_, entries| {
                Ok(BatchSendOutcome {
                    successful: entries.len(),
                    failed: Vec::new(),
                })
            });

        let (submitter, scheduler) = make_submitter(client);
        submitter.submit(make_events(1));
        assert!(scheduler.shutdown(std::time::Duration::from_secs(5)).await);
    }

    #[tokio::test]
    async fn partial_queue_failure_drops_without_retry() {
        let mut client = MockQueueClient::new();
        client
            .expect_get_queue_url()
            .return_once(|_| Ok("http://queue".to_string()));
        client
            .expect_send_message_batch()
            .times(1)
            .return_once(|_, entries| {
                Ok(BatchSendOutcome {
                    successful: entries.len() - 1,
                    failed: vec![BatchEntryFailure {
                        id: entries[0].id.clone(),
                        code: "InternalError".to_string(),
                        message: None,
                        sender_fault: false,
                    }],
                })
            });

        let stats = Arc::new(SinkStats::default());
        let scheduler = Scheduler::new(2);
        let submitter = Arc::new(FallbackSubmitter::new(
            Arc::new(client),
            "spill-queue".to_string(),
            scheduler.clone(),
            Arc::clone(&stats),
        ));

        submitter.submit(make_events(3));
        assert!(scheduler.shutdown(std::time::Duration::from_secs(5)).await);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fallback_records, 2);
        assert_eq!(snapshot.dropped_records, 1);
    }
}
