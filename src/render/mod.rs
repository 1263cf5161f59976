//! PDF rendering for quote documents.
//!
//! The consumer pipeline and the HTTP endpoint share one [`QuoteRenderer`]
//! seam. The production implementation ([`HtmlPrintEngine`]) fills an HTML
//! template and prints it with a headless browser; tests substitute mocks.

pub mod engine;

pub use engine::HtmlPrintEngine;

use async_trait::async_trait;
use thiserror::Error;

use crate::quote::models::QuoteRecord;

/// Errors that can occur while turning a quote into a PDF.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load HTML template: {0}")]
    TemplateIo(#[source] std::io::Error),
    #[error("failed to load logo image: {0}")]
    LogoIo(#[source] std::io::Error),
    #[error("failed to create temporary directory: {0}")]
    TempDir(#[source] std::io::Error),
    #[error("failed to write rendered HTML: {0}")]
    WriteHtml(#[source] std::io::Error),
    #[error("browser execution failed: {0}")]
    BrowserIo(#[source] std::io::Error),
    #[error("browser exited with status {0}")]
    BrowserExit(i32),
    #[error("failed to read generated PDF: {0}")]
    ReadPdf(#[source] std::io::Error),
    #[error("render task failed: {0}")]
    Task(String),
}

/// Converts a validated quote record into PDF bytes.
///
/// Implementations must be safe for concurrent invocation; a batch of
/// messages renders its documents in parallel.
#[async_trait]
pub trait QuoteRenderer: Send + Sync {
    async fn render(&self, record: &QuoteRecord) -> Result<Vec<u8>, RenderError>;
}
