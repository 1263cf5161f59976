//! Environment-driven configuration.
//!
//! Collaborator endpoints and loop tunables all come from the environment
//! (`.env` aware). Defaults: batch size 10, long-poll wait 20 s, inter-batch
//! delay 1 s, error backoff 5 s.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};

use crate::queue::consumer::ConsumerSettings;

const DEFAULT_QUEUE_NAME: &str = "create-quote-document";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub aws_region: String,
    pub queue_url: String,
    pub bucket: String,
    pub template_dir: PathBuf,
    pub browser_bin: String,
    pub port: u16,
    pub consumer: ConsumerSettings,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` first.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let aws_region =
            env::var("AWS_REGION").context("AWS_REGION environment variable is required")?;
        let bucket = env::var("S3_BUCKET_NAME")
            .context("S3_BUCKET_NAME environment variable is required")?;

        let queue_url = match env::var("SQS_QUEUE_URL") {
            Ok(url) => url,
            Err(_) => {
                let account_id = env::var("AWS_ACCOUNT_ID").map_err(|_| {
                    anyhow!("either SQS_QUEUE_URL or AWS_ACCOUNT_ID must be set")
                })?;
                default_queue_url(&aws_region, &account_id)
            }
        };

        let consumer = ConsumerSettings {
            batch_size: env_or("SQS_BATCH_SIZE", 10)?,
            wait_seconds: env_or("SQS_WAIT_SECONDS", 20)?,
            poll_delay: Duration::from_secs(env_or("POLL_DELAY_SECONDS", 1)?),
            error_backoff: Duration::from_secs(env_or("ERROR_BACKOFF_SECONDS", 5)?),
        };

        Ok(Self {
            aws_region,
            queue_url,
            bucket,
            template_dir: PathBuf::from(
                env::var("TEMPLATE_DIR").unwrap_or_else(|_| "static".to_string()),
            ),
            browser_bin: env::var("BROWSER_BIN").unwrap_or_else(|_| "chromium".to_string()),
            port: env_or("PORT", 8080)?,
            consumer,
        })
    }
}

/// Conventional queue URL for the quote-document queue.
fn default_queue_url(region: &str, account_id: &str) -> String {
    format!("https://sqs.{region}.amazonaws.com/{account_id}/{DEFAULT_QUEUE_NAME}")
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queue_url() {
        assert_eq!(
            default_queue_url("ap-southeast-2", "123456789012"),
            "https://sqs.ap-southeast-2.amazonaws.com/123456789012/create-quote-document"
        );
    }
}
