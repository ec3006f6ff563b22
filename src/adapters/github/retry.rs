//! Retry policy with exponential backoff for GitHub requests.
//!
//! Backoff doubles with each attempt and is capped at `max_backoff_ms`.
//! Rate-limit responses wait for the longer of the computed backoff and the
//! server's `Retry-After`.
//!
//! Retried: rate limits (403/429 with exhausted quota), 5xx, network errors.
//! Not retried: other 4xx, including 404.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use super::error::GitHubError;
use crate::domain::models::RetryConfig;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff_ms: config.initial_backoff_ms,
            max_backoff_ms: config.max_backoff_ms.max(config.initial_backoff_ms),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms: max_backoff_ms.max(initial_backoff_ms),
        }
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::debug!(retries = attempt, "GitHub request succeeded after retries");
                    }
                    return Ok(result);
                }
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = self.backoff_for(&err, attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Transient GitHub error, retrying"
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Exponential backoff for a given attempt (0-indexed).
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);
        Duration::from_millis(backoff_ms)
    }

    fn backoff_for(&self, err: &GitHubError, attempt: u32) -> Duration {
        let backoff = self.calculate_backoff(attempt);
        match err {
            GitHubError::RateLimited { retry_after } => backoff.max(*retry_after),
            _ => backoff,
        }
    }
}
