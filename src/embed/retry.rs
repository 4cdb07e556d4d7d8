//! Retry with backoff for embedding backends
//!
//! Only rate limiting (429) and model warm-up (503) are retried. Every other
//! failure, including timeouts, ends the call on the first attempt.

use crate::error::{Error, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Same delay every time
    Fixed,
    /// `base * n` before the n-th retry
    #[default]
    Linear,
    /// `base * 2^(n-1)` before the n-th retry
    Exponential,
}

/// Outcome of a single failed attempt
#[derive(Debug)]
pub enum AttemptError {
    /// Worth retrying (rate limit, warm-up)
    Transient(Error),
    /// Give up immediately
    Fatal(Error),
}

impl AttemptError {
    pub fn into_inner(self) -> Error {
        match self {
            AttemptError::Transient(e) | AttemptError::Fatal(e) => e,
        }
    }
}

impl From<Error> for AttemptError {
    fn from(err: Error) -> Self {
        AttemptError::Fatal(err)
    }
}

/// Whether an HTTP status signals a retryable backend condition
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Bounded retry policy
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Attempts including the first one
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl BackoffPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, strategy: BackoffStrategy) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            strategy,
        }
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: usize) -> Duration {
        let retry = retry.max(1) as u32;
        match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(retry),
            BackoffStrategy::Exponential => self
                .base_delay
                .saturating_mul(2u32.saturating_pow(retry - 1)),
        }
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    ///
    /// `op` receives the 0-based attempt number. Exhaustion is reported as
    /// `Error::Embedding`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = std::result::Result<T, AttemptError>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptError::Fatal(e)) => return Err(e),
                Err(AttemptError::Transient(e)) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(Error::Embedding(format!(
                            "{} failed after {} attempts: {}",
                            label, self.max_attempts, e
                        )));
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "{} hit a transient failure, retrying: {}",
                        label,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000), BackoffStrategy::Linear)
    }
}
