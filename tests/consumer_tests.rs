//! Tests for the queue consumer: per-message processing, batch fan-out,
//! failure isolation, and the start/stop lifecycle.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Barrier, Mutex};

use quote_document_server::queue::consumer::{ConsumerSettings, ProcessError};
use quote_document_server::queue::{InboundMessage, QueueClient, QueueError, QuoteConsumer};
use quote_document_server::quote::models::{QuoteRecord, REQUIRED_FIELDS};
use quote_document_server::quote::validation::ValidationError;
use quote_document_server::render::{QuoteRenderer, RenderError};
use quote_document_server::storage::{quote_object_key, ObjectStorage, StorageError, StoredObject};

/// Queue mock with scripted receive results; once the script is exhausted it
/// keeps returning empty batches.
struct MockQueue {
    script: Mutex<VecDeque<Result<Vec<InboundMessage>, QueueError>>>,
    receive_count: AtomicUsize,
    receive_delay: Duration,
    deleted: Mutex<Vec<String>>,
    fail_delete: bool,
}

impl MockQueue {
    fn new(script: Vec<Result<Vec<InboundMessage>, QueueError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            receive_count: AtomicUsize::new(0),
            receive_delay: Duration::ZERO,
            deleted: Mutex::new(Vec::new()),
            fail_delete: false,
        }
    }

    fn with_receive_delay(mut self, delay: Duration) -> Self {
        self.receive_delay = delay;
        self
    }

    fn failing_deletes(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    fn receives(&self) -> usize {
        self.receive_count.load(Ordering::SeqCst)
    }

    async fn deleted_handles(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl QueueClient for MockQueue {
    async fn receive(
        &self,
        _max_messages: u32,
        _wait_seconds: u32,
    ) -> Result<Vec<InboundMessage>, QueueError> {
        self.receive_count.fetch_add(1, Ordering::SeqCst);
        if !self.receive_delay.is_zero() {
            tokio::time::sleep(self.receive_delay).await;
        }
        self.script.lock().await.pop_front().unwrap_or(Ok(vec![]))
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        if self.fail_delete {
            return Err(QueueError::Delete("mock delete failure".to_string()));
        }
        self.deleted.lock().await.push(receipt_handle.to_string());
        Ok(())
    }
}

/// Renderer mock that fails for configured quotation numbers and can hold
/// every call at a barrier to prove the batch fans out concurrently.
struct MockRenderer {
    fail_for: Vec<String>,
    calls: AtomicUsize,
    barrier: Option<Arc<Barrier>>,
}

impl MockRenderer {
    fn new() -> Self {
        Self {
            fail_for: Vec::new(),
            calls: AtomicUsize::new(0),
            barrier: None,
        }
    }

    fn failing_for(quotation_numbers: &[&str]) -> Self {
        Self {
            fail_for: quotation_numbers.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            barrier: None,
        }
    }

    fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteRenderer for MockRenderer {
    async fn render(&self, record: &QuoteRecord) -> Result<Vec<u8>, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if self.fail_for.contains(&record.quotation_number) {
            return Err(RenderError::Task("mock render failure".to_string()));
        }
        Ok(format!("%PDF-mock {}", record.quotation_number).into_bytes())
    }
}

struct MockStorage {
    uploads: Mutex<Vec<String>>,
    should_fail: bool,
}

impl MockStorage {
    fn new() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    fn new_failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    async fn uploaded_keys(&self) -> Vec<String> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for MockStorage {
    async fn upload_quote_pdf(
        &self,
        _pdf: &[u8],
        quotation_number: &str,
    ) -> Result<StoredObject, StorageError> {
        if self.should_fail {
            return Err(StorageError::PutObject("mock upload failure".to_string()));
        }
        let key = quote_object_key(quotation_number);
        self.uploads.lock().await.push(key.clone());
        Ok(StoredObject {
            bucket: "test-bucket".to_string(),
            url: format!("https://test-bucket.s3.test.amazonaws.com/{key}"),
            key,
            etag: Some("\"mock-etag\"".to_string()),
        })
    }
}

fn quote_body(quotation_number: &str) -> String {
    let mut object = serde_json::Map::new();
    for field in REQUIRED_FIELDS {
        object.insert(field.to_string(), json!(format!("{field}-value")));
    }
    object.insert("quotationNumber".to_string(), json!(quotation_number));
    serde_json::Value::Object(object).to_string()
}

fn message(id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        receipt_handle: format!("handle-{id}"),
        body: body.to_string(),
    }
}

fn fast_settings() -> ConsumerSettings {
    ConsumerSettings {
        batch_size: 10,
        wait_seconds: 0,
        poll_delay: Duration::from_millis(10),
        error_backoff: Duration::from_millis(20),
    }
}

fn consumer(
    queue: Arc<MockQueue>,
    renderer: Arc<MockRenderer>,
    storage: Arc<MockStorage>,
) -> QuoteConsumer {
    QuoteConsumer::new(queue, renderer, storage, fast_settings())
}

#[tokio::test]
async fn test_successful_message_renders_stores_and_deletes() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer
        .process_message(message("m1", &quote_body("Q-1001")))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.quotation_number.as_deref(), Some("Q-1001"));
    let stored = outcome.stored.unwrap();
    assert!(stored.key.contains("Q-1001"));
    assert!(stored.key.ends_with("Q-1001_schedule.pdf"));
    assert_eq!(queue.deleted_handles().await, vec!["handle-m1"]);
}

#[tokio::test]
async fn test_empty_body_rejected_without_collaborator_calls() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer.process_message(message("m1", "   ")).await;

    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(ProcessError::EmptyBody)));
    assert_eq!(renderer.calls(), 0);
    assert!(storage.uploaded_keys().await.is_empty());
    assert!(queue.deleted_handles().await.is_empty());
}

#[tokio::test]
async fn test_malformed_json_not_deleted() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer.process_message(message("m1", "{not json")).await;

    assert!(!outcome.success);
    assert!(matches!(
        outcome.error,
        Some(ProcessError::Validation(ValidationError::MalformedPayload(_)))
    ));
    assert!(queue.deleted_handles().await.is_empty());
}

#[tokio::test]
async fn test_missing_field_skips_render_and_store() {
    let mut body: serde_json::Value = quote_body("Q-7").parse().unwrap();
    body.as_object_mut().unwrap().remove("vin");

    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer
        .process_message(message("m1", &body.to_string()))
        .await;

    assert!(!outcome.success);
    assert!(outcome.quotation_number.is_none());
    assert!(matches!(
        outcome.error,
        Some(ProcessError::Validation(ValidationError::MissingField("vin")))
    ));
    assert_eq!(renderer.calls(), 0);
    assert!(storage.uploaded_keys().await.is_empty());
    assert!(queue.deleted_handles().await.is_empty());
}

#[tokio::test]
async fn test_render_failure_captured_and_not_deleted() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::failing_for(&["Q-BAD"]));
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer
        .process_message(message("m1", &quote_body("Q-BAD")))
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.quotation_number.as_deref(), Some("Q-BAD"));
    assert!(matches!(outcome.error, Some(ProcessError::Render(_))));
    assert!(storage.uploaded_keys().await.is_empty());
    assert!(queue.deleted_handles().await.is_empty());
}

#[tokio::test]
async fn test_store_failure_captured_and_not_deleted() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new_failing());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer
        .process_message(message("m1", &quote_body("Q-1")))
        .await;

    assert!(!outcome.success);
    assert!(matches!(outcome.error, Some(ProcessError::Store(_))));
    assert!(queue.deleted_handles().await.is_empty());
}

#[tokio::test]
async fn test_delete_failure_does_not_flip_success() {
    let queue = Arc::new(MockQueue::new(vec![]).failing_deletes());
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let outcome = consumer
        .process_message(message("m1", &quote_body("Q-1")))
        .await;

    // Render and store already succeeded; a lost delete only risks a
    // harmless duplicate redelivery.
    assert!(outcome.success);
    assert!(outcome.stored.is_some());
}

#[tokio::test]
async fn test_batch_accounting_with_mixed_outcomes() {
    let batch = vec![
        message("m1", &quote_body("Q-1")),
        message("m2", "{broken"),
        message("m3", &quote_body("Q-RENDER-FAIL")),
        message("m4", &quote_body("Q-4")),
        message("m5", &quote_body("Q-5")),
    ];
    let queue = Arc::new(MockQueue::new(vec![Ok(batch)]));
    let renderer = Arc::new(MockRenderer::failing_for(&["Q-RENDER-FAIL"]));
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let summary = consumer.poll_once().await.unwrap();

    assert_eq!(summary.received, 5);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.outcomes.len(), 5);

    // Exactly one delete per success.
    let mut deleted = queue.deleted_handles().await;
    deleted.sort();
    assert_eq!(deleted, vec!["handle-m1", "handle-m4", "handle-m5"]);

    let mut keys = storage.uploaded_keys().await;
    keys.sort();
    assert_eq!(keys.len(), 3);
    assert!(keys.iter().any(|k| k.contains("Q-4")));
}

#[tokio::test]
async fn test_batch_messages_processed_concurrently() {
    // Every render call waits at the barrier until all three arrive; if the
    // batch were processed sequentially this would never settle.
    let barrier = Arc::new(Barrier::new(3));
    let batch = vec![
        message("m1", &quote_body("Q-1")),
        message("m2", &quote_body("Q-FAIL")),
        message("m3", &quote_body("Q-3")),
    ];
    let queue = Arc::new(MockQueue::new(vec![Ok(batch)]));
    let renderer = Arc::new(MockRenderer::failing_for(&["Q-FAIL"]).with_barrier(barrier));
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let summary = tokio::time::timeout(Duration::from_secs(5), consumer.poll_once())
        .await
        .expect("batch did not fan out concurrently")
        .unwrap();

    // The failing sibling did not prevent the others from completing.
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_empty_poll_is_normal() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    let summary = consumer.poll_once().await.unwrap();
    assert_eq!(summary.received, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
}

#[tokio::test]
async fn test_receive_failure_surfaces_from_poll_once() {
    let queue = Arc::new(MockQueue::new(vec![Err(QueueError::Receive(
        "mock receive failure".to_string(),
    ))]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    assert!(consumer.poll_once().await.is_err());
}

#[tokio::test]
async fn test_loop_survives_receive_failures() {
    let queue = Arc::new(MockQueue::new(vec![
        Err(QueueError::Receive("mock receive failure".to_string())),
        Err(QueueError::Receive("mock receive failure".to_string())),
    ]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    consumer.start();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(consumer.is_active());
    // Got past both scripted failures and kept polling.
    assert!(queue.receives() > 2);
    consumer.stop();
}

#[tokio::test]
async fn test_start_twice_spawns_single_loop() {
    // Each receive blocks for 100ms, so within the first 50ms a single loop
    // accounts for exactly one receive call.
    let queue = Arc::new(MockQueue::new(vec![]).with_receive_delay(Duration::from_millis(100)));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    consumer.start();
    consumer.start();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(consumer.is_active());
    assert_eq!(queue.receives(), 1);
    consumer.stop();
}

#[tokio::test]
async fn test_stop_halts_polling() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    consumer.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    consumer.stop();
    assert!(!consumer.is_active());

    // Allow the loop to observe the flag, then verify no further receives.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let after_stop = queue.receives();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(queue.receives(), after_stop);
}

#[tokio::test]
async fn test_stop_without_start_is_inactive() {
    let queue = Arc::new(MockQueue::new(vec![]));
    let renderer = Arc::new(MockRenderer::new());
    let storage = Arc::new(MockStorage::new());
    let consumer = consumer(queue.clone(), renderer.clone(), storage.clone());

    assert!(!consumer.is_active());
    consumer.stop();
    assert!(!consumer.is_active());
    assert_eq!(queue.receives(), 0);
}
