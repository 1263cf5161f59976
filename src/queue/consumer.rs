//! The quote consumer: polling loop, batch fan-out, and per-message
//! processing.
//!
//! One message is one unit of work: validate, render, store, then delete.
//! Failures are isolated per message; the loop itself only ever stops on
//! `stop()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;

use super::{InboundMessage, QueueClient, QueueError};
use crate::quote::validation::{parse_quote_payload, ValidationError};
use crate::render::{QuoteRenderer, RenderError};
use crate::storage::{ObjectStorage, StorageError, StoredObject};

/// Tunables for the polling loop, all overridable from the environment.
#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Maximum messages fetched per receive call.
    pub batch_size: u32,
    /// Long-poll wait passed to the broker, in seconds.
    pub wait_seconds: u32,
    /// Delay between successful poll iterations.
    pub poll_delay: Duration,
    /// Delay after a failed receive before the next attempt.
    pub error_backoff: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            wait_seconds: 20,
            poll_delay: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
        }
    }
}

/// Why processing one message failed.
///
/// Validation failures are terminal for the payload; render and store
/// failures may be transient, and redelivery can succeed.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("message body is empty")]
    EmptyBody,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to generate PDF: {0}")]
    Render(#[from] RenderError),
    #[error("failed to store PDF: {0}")]
    Store(#[from] StorageError),
}

/// Result of handling one inbound message.
#[derive(Debug)]
pub struct ProcessingOutcome {
    pub success: bool,
    pub message_id: String,
    /// Present when parsing got far enough to extract it.
    pub quotation_number: Option<String>,
    pub stored: Option<StoredObject>,
    pub error: Option<ProcessError>,
}

/// Tally of one poll iteration. Zero received messages is the normal
/// long-poll-timeout case, not an error.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub received: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<ProcessingOutcome>,
}

struct ConsumerInner {
    queue: Arc<dyn QueueClient>,
    renderer: Arc<dyn QuoteRenderer>,
    storage: Arc<dyn ObjectStorage>,
    settings: ConsumerSettings,
    running: AtomicBool,
}

/// Long-running queue consumer with cooperative start/stop lifecycle.
///
/// Cloning is cheap and shares the same lifecycle state, so a clone handed to
/// the HTTP layer observes the real loop via [`QuoteConsumer::is_active`].
#[derive(Clone)]
pub struct QuoteConsumer {
    inner: Arc<ConsumerInner>,
}

impl QuoteConsumer {
    pub fn new(
        queue: Arc<dyn QueueClient>,
        renderer: Arc<dyn QuoteRenderer>,
        storage: Arc<dyn ObjectStorage>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ConsumerInner {
                queue,
                renderer,
                storage,
                settings,
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Launch the polling loop on the runtime. Idempotent: a second call
    /// while the loop is running warns and does nothing.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            log::warn!("Quote consumer is already running");
            return;
        }

        log::info!("Starting quote consumer");
        let consumer = self.clone();
        tokio::spawn(async move {
            consumer.run_loop().await;
        });
    }

    /// Request a cooperative stop. The loop observes the flag at the next
    /// iteration boundary; the in-flight batch is allowed to finish.
    pub fn stop(&self) {
        log::info!("Stopping quote consumer");
        self.inner.running.store(false, Ordering::SeqCst);
    }

    /// Whether the polling loop is currently live. Read by `/health`.
    pub fn is_active(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    async fn run_loop(&self) {
        log::info!("Quote consumer loop started");

        while self.is_active() {
            match self.poll_once().await {
                Ok(summary) if summary.received > 0 => {
                    log::info!(
                        "Batch processing complete: {} successful, {} failed",
                        summary.succeeded,
                        summary.failed
                    );
                }
                Ok(_) => {
                    // Normal with long polling on a quiet queue.
                    log::debug!("No messages received from queue");
                }
                Err(e) => {
                    log::error!("Error polling queue: {e}");
                    tokio::time::sleep(self.inner.settings.error_backoff).await;
                }
            }

            if self.is_active() {
                tokio::time::sleep(self.inner.settings.poll_delay).await;
            }
        }

        // Covers both a clean stop and the loop winding down for any other
        // reason, so liveness reporting never claims a dead loop is active.
        self.inner.running.store(false, Ordering::SeqCst);
        log::info!("Quote consumer loop stopped");
    }

    /// Fetch one bounded batch and process every message concurrently.
    ///
    /// Per-message failures become failed outcomes in the summary and never
    /// cancel sibling messages. An `Err` here means the receive call itself
    /// failed; the caller retries on the next iteration.
    pub async fn poll_once(&self) -> Result<BatchSummary, QueueError> {
        let settings = &self.inner.settings;
        let messages = self
            .inner
            .queue
            .receive(settings.batch_size, settings.wait_seconds)
            .await?;

        if messages.is_empty() {
            return Ok(BatchSummary::default());
        }

        let received = messages.len();
        log::info!("Received {received} messages from queue");

        let outcomes = join_all(
            messages
                .into_iter()
                .map(|message| self.process_message(message)),
        )
        .await;

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Ok(BatchSummary {
            received,
            succeeded,
            failed: received - succeeded,
            outcomes,
        })
    }

    /// Validate, render, store, and acknowledge one message.
    ///
    /// The message is deleted only after render and store both succeeded. A
    /// failed delete is logged but does not flip the outcome: the document
    /// exists, and the worst case is a duplicate redelivery.
    pub async fn process_message(&self, message: InboundMessage) -> ProcessingOutcome {
        log::debug!("Processing message: {}", message.id);

        match self.try_process(&message).await {
            Ok((quotation_number, stored)) => {
                if let Err(e) = self.inner.queue.delete(&message.receipt_handle).await {
                    log::error!(
                        "Failed to delete message {} after successful processing: {e}",
                        message.id
                    );
                }

                log::info!("Successfully processed message for quotation {quotation_number}");
                ProcessingOutcome {
                    success: true,
                    message_id: message.id,
                    quotation_number: Some(quotation_number),
                    stored: Some(stored),
                    error: None,
                }
            }
            Err((quotation_number, error)) => {
                // Not deleted: the broker redelivers or dead-letters it.
                log::error!("Error processing message {}: {error}", message.id);
                ProcessingOutcome {
                    success: false,
                    message_id: message.id,
                    quotation_number,
                    stored: None,
                    error: Some(error),
                }
            }
        }
    }

    async fn try_process(
        &self,
        message: &InboundMessage,
    ) -> Result<(String, StoredObject), (Option<String>, ProcessError)> {
        if message.body.trim().is_empty() {
            return Err((None, ProcessError::EmptyBody));
        }

        let record = parse_quote_payload(&message.body).map_err(|e| (None, e.into()))?;
        let quotation_number = record.quotation_number.clone();
        log::info!("Validated quote payload for quotation: {quotation_number}");

        let pdf = self
            .inner
            .renderer
            .render(&record)
            .await
            .map_err(|e| (Some(quotation_number.clone()), e.into()))?;

        let stored = self
            .inner
            .storage
            .upload_quote_pdf(&pdf, &quotation_number)
            .await
            .map_err(|e| (Some(quotation_number.clone()), e.into()))?;

        Ok((quotation_number, stored))
    }
}
