use super::backoff::Backoff;
use super::buffer::{BufferLimits, EventBuffer};
use super::clock::Clock;
use super::fallback::FallbackSubmitter;
use super::primary::PrimarySubmitter;
use super::scheduler::Scheduler;
use super::stats::{SinkStats, StatsSnapshot};
use super::{Event, MAX_BYTES_FALLBACK, MAX_BYTES_PRIMARY, Sink};
use crate::client::{
    ClientError, KinesisStreamClient, QueueClient, SqsQueueClient, StreamClient, load_sdk_config,
};
use crate::config::{ConfigError, SinkConfig};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// How long `shutdown` waits for in-flight submitter tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum InitError {
    #[error("invalid sink configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build downstream clients: {0}")]
    Client(#[from] ClientError),
}

/// Public facade of the sink subsystem.
///
/// Wires the buffer, scheduler and submitters, owns the periodic flush
/// timer and implements the shutdown drain. Delivery errors never surface
/// through this type; the only user-visible failure is `init` refusing to
/// start on bad configuration.
pub struct KinesisSink {
    buffer: EventBuffer,
    primary: Arc<PrimarySubmitter>,
    scheduler: Scheduler,
    stats: Arc<SinkStats>,
    clock: Clock,
    max_bytes: usize,
    time_limit_millis: u64,
    stream_name: String,
}

impl KinesisSink {
    /// Validates the configuration, builds the AWS clients, runs the
    /// startup availability checks, arms the periodic flush timer and
    /// installs the process-exit hook for the final drain.
    pub async fn init(config: SinkConfig) -> Result<Arc<Self>, InitError> {
        config.validate()?;
        let sdk_config = load_sdk_config(&config).await?;
        let stream_client: Arc<dyn StreamClient> =
            Arc::new(KinesisStreamClient::new(&sdk_config));
        let queue_client: Option<Arc<dyn QueueClient>> = config
            .fallback_queue_name
            .as_ref()
            .map(|_| Arc::new(SqsQueueClient::new(&sdk_config)) as Arc<dyn QueueClient>);
        let sink = Self::with_clients(config, stream_client, queue_client).await?;
        let _ = crate::shutdown::install_shutdown_hook(Arc::clone(&sink) as Arc<dyn Sink>);
        Ok(sink)
    }

    /// Wires the sink from pre-built clients. Split out of `init` so tests
    /// can drive the sink with scripted clients.
    pub async fn with_clients(
        config: SinkConfig,
        stream_client: Arc<dyn StreamClient>,
        queue_client: Option<Arc<dyn QueueClient>>,
    ) -> Result<Arc<Self>, InitError> {
        config.validate()?;

        let stats = Arc::new(SinkStats::default());
        let clock = Clock::new();
        let scheduler = Scheduler::new(config.thread_pool_size);
        let backoff = Backoff::new(config.min_backoff, config.max_backoff);

        let fallback = match (&config.fallback_queue_name, queue_client) {
            (Some(queue_name), Some(client)) => Some(Arc::new(FallbackSubmitter::new(
                client,
                queue_name.clone(),
                scheduler.clone(),
                Arc::clone(&stats),
            ))),
            _ => None,
        };

        let stream_ready = match stream_client.describe_stream(&config.stream_name).await {
            Ok(status) if status.is_ready() => true,
            Ok(status) => {
                error!(
                    stream = %config.stream_name,
                    status = ?status,
                    "primary stream exists but is not ready"
                );
                false
            }
            Err(err) => {
                error!(
                    stream = %config.stream_name,
                    error = %err,
                    "primary stream is not available"
                );
                false
            }
        };
        if let Some(fallback) = &fallback {
            // lookup failure is already logged by the submitter; it keeps
            // retrying the resolution on first use
            let _ = fallback.check_queue().await;
        }
        if !stream_ready && fallback.is_none() {
            warn!(
                stream = %config.stream_name,
                "primary stream unavailable and no fallback queue configured, events will be dropped until the stream appears"
            );
        }

        // Any event may ultimately be spilled to the queue, so the stricter
        // limit applies on ingest whenever a fallback is configured.
        let max_bytes = if fallback.is_some() {
            MAX_BYTES_FALLBACK
        } else {
            MAX_BYTES_PRIMARY
        };

        let buffer = EventBuffer::new(
            BufferLimits {
                byte_limit: config.byte_limit,
                record_limit: config.record_limit,
                max_bytes,
            },
            clock.clone(),
            Arc::clone(&stats),
        );

        let primary = Arc::new(PrimarySubmitter::new(
            stream_client,
            config.stream_name.clone(),
            scheduler.clone(),
            backoff,
            fallback.clone(),
            Arc::clone(&stats),
        ));

        let sink = Arc::new(Self {
            buffer,
            primary,
            scheduler,
            stats,
            clock,
            max_bytes,
            time_limit_millis: config.time_limit,
            stream_name: config.stream_name.clone(),
        });
        sink.arm_flush_timer(Duration::from_millis(sink.time_limit_millis));

        info!(
            stream = %config.stream_name,
            byte_limit = config.byte_limit,
            record_limit = config.record_limit,
            time_limit_ms = config.time_limit,
            fallback = fallback.is_some(),
            max_bytes,
            "kinesis sink initialised"
        );
        Ok(sink)
    }

    fn dispatch(&self, batch: Vec<Event>) {
        self.primary.submit(batch);
    }

    /// Recursive self-scheduling timer. Reading `last_flush_at` instead of
    /// flushing unconditionally makes the timer self-correcting: a recent
    /// size- or count-triggered flush pushes the next tick out.
    fn arm_flush_timer(self: &Arc<Self>, delay: Duration) {
        let this = Arc::clone(self);
        self.scheduler.schedule_after(delay, async move {
            let elapsed = this
                .clock
                .now_millis()
                .saturating_sub(this.buffer.last_flush_at());
            if elapsed >= this.time_limit_millis {
                let batch = this.buffer.flush();
                if !batch.is_empty() {
                    debug!(stream = %this.stream_name, count = batch.len(), "time-triggered flush");
                }
                this.dispatch(batch);
                this.arm_flush_timer(Duration::from_millis(this.time_limit_millis));
            } else {
                this.arm_flush_timer(Duration::from_millis(this.time_limit_millis - elapsed));
            }
        });
    }
}

#[async_trait]
impl Sink for KinesisSink {
    fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    fn store_raw_events(&self, payloads: Vec<Bytes>, key: &str) -> Vec<Bytes> {
        if self.scheduler.is_shutdown() {
            // accepted best-effort: anything not picked up by the final
            // drain is lost
            debug!(
                stream = %self.stream_name,
                count = payloads.len(),
                "store during shutdown"
            );
        }
        for payload in payloads {
            if let Some(batch) = self.buffer.store(payload, key) {
                self.dispatch(batch);
            }
        }
        Vec::new()
    }

    fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    async fn shutdown(&self) {
        info!(stream = %self.stream_name, "shutting down kinesis sink");

        let pending = self.buffer.flush();
        if !pending.is_empty() {
            debug!(count = pending.len(), "final drain");
        }
        self.dispatch(pending);

        if self.scheduler.shutdown(SHUTDOWN_GRACE).await {
            info!(stream = %self.stream_name, "sink drained");
        } else {
            warn!(
                stream = %self.stream_name,
                grace_secs = SHUTDOWN_GRACE.as_secs(),
                "submitter tasks still in flight after the shutdown grace period"
            );
        }
    }
}
