use std::future::Future;
use std::time::Duration;

use log::{debug, warn};

use crate::error::DownloadError;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Performs single GET requests with a fixed browser-like User-Agent.
///
/// The inner `reqwest::Client` keeps its connection pool behind an `Arc`,
/// so cloning a `Fetcher` into every worker shares the same session.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, DownloadError> {
        // Longer timeout for slow image hosts
        Self::with_timeout(Duration::from_secs(60))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `url` and returns the raw body. Any non-2xx status is an error.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    pub async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        let body = self.fetch(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub async fn fetch_with_retry(&self, url: &str, policy: &RetryPolicy) -> Result<Vec<u8>, DownloadError> {
        policy.run(|_| self.fetch(url)).await
    }

    pub async fn fetch_text_with_retry(&self, url: &str, policy: &RetryPolicy) -> Result<String, DownloadError> {
        policy.run(|_| self.fetch_text(url)).await
    }
}

/// Bounded retry with a fixed pause between attempts. No jitter, no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Runs `operation` until it succeeds or `max_attempts` is reached.
    ///
    /// The closure receives the 1-based attempt number. The delay is only
    /// awaited between attempts, never after the last one, and the error of
    /// the final attempt is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, DownloadError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DownloadError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => return Err(e),
                Err(e) => {
                    warn!("attempt {}/{} failed: {}", attempt, max_attempts, e);
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
