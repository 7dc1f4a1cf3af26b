use super::{ClientError, RecordResult, StreamClient, StreamStatus};
use crate::sink::Event;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_config::retry::RetryConfig;
use aws_sdk_kinesis::Client;
use aws_sdk_kinesis::error::{DisplayErrorContext, SdkError};
use aws_sdk_kinesis::operation::describe_stream::DescribeStreamError;
use aws_sdk_kinesis::operation::put_records::PutRecordsError;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::{PutRecordsRequestEntry, StreamStatus as SdkStreamStatus};
use rand::Rng;
use std::time::Duration;
use tracing::warn;

/// Inner retry window for transient put failures. Throughput errors are
/// never retried here; they surface immediately so the sink can choose
/// between in-memory rescheduling and fallback spillover.
const MAX_PUT_ATTEMPTS: u32 = 10;
const RETRY_BASE: Duration = Duration::from_secs(1);
const RETRY_CAP: Duration = Duration::from_secs(5 * 60 * 60);

/// Kinesis implementation of the primary-stream contract.
pub struct KinesisStreamClient {
    client: Client,
}

impl KinesisStreamClient {
    /// The SDK's own retry machinery is disabled: this wrapper owns the
    /// retry policy so throughput errors can opt out of it.
    pub fn new(config: &SdkConfig) -> Self {
        let conf = aws_sdk_kinesis::config::Builder::from(config)
            .retry_config(RetryConfig::disabled())
            .build();
        Self {
            client: Client::from_conf(conf),
        }
    }
}

#[async_trait]
impl StreamClient for KinesisStreamClient {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamStatus, ClientError> {
        let out = self
            .client
            .describe_stream()
            .stream_name(stream_name)
            .send()
            .await
            .map_err(|err| classify_describe_error(stream_name, err))?;

        let status = out
            .stream_description()
            .map(|description| description.stream_status().clone())
            .ok_or_else(|| {
                ClientError::Service(format!("no stream description returned for {stream_name}"))
            })?;

        Ok(match status {
            SdkStreamStatus::Active => StreamStatus::Active,
            SdkStreamStatus::Updating => StreamStatus::Updating,
            other => StreamStatus::Other(other.as_str().to_string()),
        })
    }

    async fn put_records(
        &self,
        stream_name: &str,
        events: &[Event],
    ) -> Result<Vec<RecordResult>, ClientError> {
        let mut entries = Vec::with_capacity(events.len());
        for event in events {
            entries.push(
                PutRecordsRequestEntry::builder()
                    .data(Blob::new(event.payload.to_vec()))
                    .partition_key(event.key.clone())
                    .build()
                    .map_err(|err| ClientError::Construction(err.to_string()))?,
            );
        }

        let mut ceiling = RETRY_BASE;
        let mut attempt = 1u32;
        loop {
            let result = self
                .client
                .put_records()
                .stream_name(stream_name)
                .set_records(Some(entries.clone()))
                .send()
                .await;

            match result {
                Ok(out) => {
                    return Ok(out
                        .records()
                        .iter()
                        .map(|record| RecordResult {
                            error_code: record.error_code().map(str::to_string),
                            error_message: record.error_message().map(str::to_string),
                        })
                        .collect());
                }
                Err(err) if attempt < MAX_PUT_ATTEMPTS && is_transient(&err) => {
                    warn!(
                        stream = stream_name,
                        attempt,
                        error = %DisplayErrorContext(&err),
                        "transient put failure, backing off"
                    );
                    tokio::time::sleep(full_jitter(ceiling)).await;
                    ceiling = (ceiling * 2).min(RETRY_CAP);
                    attempt += 1;
                }
                Err(err) => return Err(classify_put_error(stream_name, err)),
            }
        }
    }
}

/// Only transport-level failures are worth a cheap client-side retry;
/// service responses (throughput, validation, KMS) surface to the caller.
fn is_transient(err: &SdkError<PutRecordsError>) -> bool {
    matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_)
    )
}

/// Uniform sample in `[0, ceiling]`.
fn full_jitter(ceiling: Duration) -> Duration {
    let millis = ceiling.as_millis() as u64;
    Duration::from_millis(rand::rng().random_range(0..=millis))
}

fn classify_put_error(stream_name: &str, err: SdkError<PutRecordsError>) -> ClientError {
    match &err {
        SdkError::ServiceError(ctx) => {
            let service_err = ctx.err();
            if service_err.is_provisioned_throughput_exceeded_exception() {
                ClientError::Throttled(format!("stream {stream_name}"))
            } else if service_err.is_resource_not_found_exception() {
                ClientError::NotFound(format!("stream {stream_name}"))
            } else {
                ClientError::Service(DisplayErrorContext(&err).to_string())
            }
        }
        SdkError::ConstructionFailure(_) => {
            ClientError::Construction(DisplayErrorContext(&err).to_string())
        }
        _ => ClientError::Network(DisplayErrorContext(&err).to_string()),
    }
}

fn classify_describe_error(stream_name: &str, err: SdkError<DescribeStreamError>) -> ClientError {
    match &err {
        SdkError::ServiceError(ctx) if ctx.err().is_resource_not_found_exception() => {
            ClientError::NotFound(format!("stream {stream_name}"))
        }
        SdkError::ServiceError(_) => ClientError::Service(DisplayErrorContext(&err).to_string()),
        SdkError::ConstructionFailure(_) => {
            ClientError::Construction(DisplayErrorContext(&err).to_string())
        }
        _ => ClientError::Network(DisplayErrorContext(&err).to_string()),
    }
}
