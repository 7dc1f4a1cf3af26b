pub mod credentials;
pub mod kinesis;
pub mod sqs;

pub use credentials::{CredentialsMode, load_sdk_config};
pub use kinesis::KinesisStreamClient;
pub use sqs::SqsQueueClient;

use crate::sink::Event;
use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("throughput exceeded: {0}")]
    Throttled(String),
    #[error("service error: {0}")]
    Service(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request construction failed: {0}")]
    Construction(String),
}

/// Status of the primary stream as reported by the downstream service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Active,
    Updating,
    Other(String),
}

impl StreamStatus {
    /// The stream accepts puts in both `Active` and `Updating`.
    pub fn is_ready(&self) -> bool {
        matches!(self, StreamStatus::Active | StreamStatus::Updating)
    }
}

/// Outcome of one record inside a bulk put, positionally aligned with the
/// request.
#[derive(Debug, Clone, Default)]
pub struct RecordResult {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl RecordResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code.into()),
            error_message: Some(message.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error_code.is_some() || self.error_message.is_some()
    }
}

/// One message headed for the fallback queue. `key` becomes the
/// `kinesisKey` message attribute; `body` is already base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub body: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct BatchEntryFailure {
    pub id: String,
    pub code: String,
    pub message: Option<String>,
    pub sender_fault: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BatchSendOutcome {
    pub successful: usize,
    pub failed: Vec<BatchEntryFailure>,
}

/// Contract of the primary stream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StreamClient: Send + Sync {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamStatus, ClientError>;

    /// Bulk-put. `Ok` carries one result per input event, in order; `Err`
    /// means the whole call failed and every event must be considered
    /// undelivered.
    async fn put_records(
        &self,
        stream_name: &str,
        events: &[Event],
    ) -> Result<Vec<RecordResult>, ClientError>;
}

/// Contract of the fallback queue.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String, ClientError>;

    /// Batch send of at most 10 entries.
    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<QueueMessage>,
    ) -> Result<BatchSendOutcome, ClientError>;
}
