//! Queue-driven ingestion pipeline.
//!
//! This module is split into submodules for separation of concerns:
//! - `sqs` - the SQS-backed queue client
//! - `consumer` - the polling loop, batch fan-out, and per-message processing

pub mod consumer;
pub mod sqs;

pub use consumer::{BatchSummary, ProcessingOutcome, QuoteConsumer};
pub use sqs::SqsQueueClient;

use async_trait::async_trait;
use thiserror::Error;

/// One delivery from the queue.
///
/// The receipt handle is the broker's opaque redelivery token; deleting with
/// it acknowledges the message. Delivery counts are the broker's concern and
/// are not tracked here.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub receipt_handle: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("SQS ReceiveMessage error: {0}")]
    Receive(String),
    #[error("SQS DeleteMessage error: {0}")]
    Delete(String),
}

/// Capability contract for the message broker.
///
/// `receive` long-polls for up to `wait_seconds`; an empty result is normal.
/// Implementations must be safe for concurrent use, since deletes for one
/// batch overlap.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn receive(
        &self,
        max_messages: u32,
        wait_seconds: u32,
    ) -> Result<Vec<InboundMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;
}
