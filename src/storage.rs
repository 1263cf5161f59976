//! Object storage for generated quote PDFs.
//!
//! The consumer uploads each rendered document under a date-partitioned key:
//! `quotes/<YYYY>/<MonthName>/<quotationNumber>/<quotationNumber>_schedule.pdf`.
//! The production implementation talks to S3; tests substitute mocks through
//! the [`ObjectStorage`] trait.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_smithy_types::byte_stream::ByteStream;
use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 PutObject error: {0}")]
    PutObject(String),
}

/// Location of a successfully stored document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub url: String,
    pub etag: Option<String>,
}

/// Persists rendered quote PDFs.
///
/// Implementations must tolerate concurrent uploads; a batch stores its
/// documents in parallel.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload_quote_pdf(
        &self,
        pdf: &[u8],
        quotation_number: &str,
    ) -> Result<StoredObject, StorageError>;
}

/// Build the storage key for a quote document, partitioned by the current
/// year and English month name.
pub fn quote_object_key(quotation_number: &str) -> String {
    let now = Utc::now();
    let year = now.year();
    let month = month_name(now.month());
    format!("quotes/{year}/{month}/{quotation_number}/{quotation_number}_schedule.pdf")
}

fn month_name(month: u32) -> &'static str {
    const MONTHS: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    MONTHS[(month.saturating_sub(1) as usize).min(11)]
}

/// S3-backed quote document store.
pub struct S3QuoteStorage {
    client: Client,
    bucket: String,
    region: String,
}

impl S3QuoteStorage {
    pub fn new(client: Client, bucket: String, region: String) -> Self {
        Self {
            client,
            bucket,
            region,
        }
    }
}

#[async_trait]
impl ObjectStorage for S3QuoteStorage {
    async fn upload_quote_pdf(
        &self,
        pdf: &[u8],
        quotation_number: &str,
    ) -> Result<StoredObject, StorageError> {
        let key = quote_object_key(quotation_number);

        let resp = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(pdf.to_vec()))
            .content_type("application/pdf")
            .content_disposition(format!(
                "attachment; filename=\"{quotation_number}_schedule.pdf\""
            ))
            .metadata("quotationNumber", quotation_number)
            .metadata("documentType", "mbi-quote")
            .metadata("generatedAt", Utc::now().to_rfc3339())
            .send()
            .await
            .map_err(|e| StorageError::PutObject(e.into_service_error().to_string()))?;

        log::info!("Successfully uploaded PDF to S3: {key}");

        Ok(StoredObject {
            bucket: self.bucket.clone(),
            url: format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
            key,
            etag: resp.e_tag().map(|s| s.to_string()),
        })
    }
}
