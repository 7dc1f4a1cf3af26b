use super::{BatchEntryFailure, BatchSendOutcome, ClientError, QueueClient, QueueMessage};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::{DisplayErrorContext, SdkError};
use aws_sdk_sqs::operation::get_queue_url::GetQueueUrlError;
use aws_sdk_sqs::types::{MessageAttributeValue, SendMessageBatchRequestEntry};

/// Message attribute carrying the original partition key, so a replayer can
/// restore the event onto the stream it was meant for.
const PARTITION_KEY_ATTRIBUTE: &str = "kinesisKey";

/// SQS implementation of the fallback-queue contract.
pub struct SqsQueueClient {
    client: Client,
}

impl SqsQueueClient {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn get_queue_url(&self, queue_name: &str) -> Result<String, ClientError> {
        let out = self
            .client
            .get_queue_url()
            .queue_name(queue_name)
            .send()
            .await
            .map_err(|err| classify_get_url_error(queue_name, err))?;

        out.queue_url()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Service(format!("no url returned for queue {queue_name}")))
    }

    async fn send_message_batch(
        &self,
        queue_url: &str,
        entries: Vec<QueueMessage>,
    ) -> Result<BatchSendOutcome, ClientError> {
        let mut request_entries = Vec::with_capacity(entries.len());
        for entry in entries {
            let key_attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(entry.key)
                .build()
                .map_err(|err| ClientError::Construction(err.to_string()))?;
            request_entries.push(
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .message_attributes(PARTITION_KEY_ATTRIBUTE, key_attribute)
                    .build()
                    .map_err(|err| ClientError::Construction(err.to_string()))?,
            );
        }

        let out = self
            .client
            .send_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(|err| ClientError::Network(DisplayErrorContext(&err).to_string()))?;

        Ok(BatchSendOutcome {
            successful: out.successful().len(),
            failed: out
                .failed()
                .iter()
                .map(|entry| BatchEntryFailure {
                    id: entry.id().to_string(),
                    code: entry.code().to_string(),
                    message: entry.message().map(str::to_string),
                    sender_fault: entry.sender_fault(),
                })
                .collect(),
        })
    }
}

fn classify_get_url_error(queue_name: &str, err: SdkError<GetQueueUrlError>) -> ClientError {
    match &err {
        SdkError::ServiceError(ctx) if ctx.err().is_queue_does_not_exist() => {
            ClientError::NotFound(format!("queue {queue_name}"))
        }
        SdkError::ServiceError(_) => ClientError::Service(DisplayErrorContext(&err).to_string()),
        _ => ClientError::Network(DisplayErrorContext(&err).to_string()),
    }
}
