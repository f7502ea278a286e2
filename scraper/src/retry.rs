//! Bounded retry with exponential backoff for transient failures.

use crate::error::ScrapeError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Classifies errors as transient (worth retrying) or permanent.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried.
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ScrapeError {
    fn is_retryable(&self) -> bool {
        match self {
            ScrapeError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScrapeError::Api { transient, .. } => *transient,
            // credential, quota, and resolution failures won't fix themselves
            ScrapeError::Resolution(_)
            | ScrapeError::Auth(_)
            | ScrapeError::QuotaExceeded(_)
            | ScrapeError::Decode { .. }
            | ScrapeError::Export(_) => false,
        }
    }
}

/// How many times, and how patiently, to retry a transient failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after every retry.
    pub backoff_multiplier: f64,
    /// Randomize each delay by up to ±25%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Runs `operation`, retrying it while it fails with a retryable error.
    ///
    /// Returns the first success, the first permanent error, or the last transient error
    /// once retries are exhausted.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: IsRetryable + std::fmt::Display,
    {
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        tracing::debug!(attempts = attempt + 1, "operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis(),
                        "transient failure, retrying"
                    );

                    let wait = if self.jitter { add_jitter(delay) } else { delay };
                    tokio::time::sleep(wait).await;

                    delay = Duration::from_secs_f64(delay.as_secs_f64() * self.backoff_multiplier)
                        .min(self.max_delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn add_jitter(delay: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.75..=1.25);
    Duration::from_secs_f64(delay.as_secs_f64() * factor)
}
