//! SQS-backed implementation of the queue client.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use uuid::Uuid;

use super::{InboundMessage, QueueClient, QueueError};

/// Queue client over AWS SQS (or an SQS-compatible broker).
pub struct SqsQueueClient {
    client: Client,
    queue_url: String,
}

impl SqsQueueClient {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(
        &self,
        max_messages: u32,
        wait_seconds: u32,
    ) -> Result<Vec<InboundMessage>, QueueError> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages as i32)
            .wait_time_seconds(wait_seconds as i32)
            .send()
            .await
            .map_err(|e| QueueError::Receive(e.into_service_error().to_string()))?;

        let messages = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                // A delivery without a receipt handle cannot be acknowledged,
                // so it is skipped and left to redelivery.
                let receipt_handle = match message.receipt_handle {
                    Some(handle) => handle,
                    None => {
                        log::warn!("Received SQS message without receipt handle, skipping");
                        return None;
                    }
                };
                Some(InboundMessage {
                    id: message
                        .message_id
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    receipt_handle,
                    body: message.body.unwrap_or_default(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete(e.into_service_error().to_string()))?;

        log::debug!("Message deleted from queue");
        Ok(())
    }
}
