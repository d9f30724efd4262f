//! Bounded retry with fixed backoff.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::config::TransportConfig;

/// Failures that may go away on a later attempt.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for super::FetchError {
    fn is_retryable(&self) -> bool {
        super::FetchError::is_retryable(self)
    }
}

/// Why a single attempt did not succeed.
#[derive(Debug)]
pub enum AttemptFailure<E> {
    Failed(E),
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "{}", e),
            Self::TimedOut(after) => write!(f, "timed out after {:?}", after),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: fmt::Debug + fmt::Display> {
    /// Not retryable; returned from the attempt that produced it.
    #[error("{0}")]
    Fatal(E),

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: AttemptFailure<E> },
}

/// Per-attempt timeout, retry budget and the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&TransportConfig::default())
    }
}

/// Longest pause allowed between attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

impl From<&TransportConfig> for RetryPolicy {
    fn from(config: &TransportConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            max_retries: config.max_retries,
            backoff: backoff_from_secs(config.backoff_seconds),
        }
    }
}

/// Negative and NaN become zero; anything past [`MAX_BACKOFF`], infinity
/// included, is clamped to it.
fn backoff_from_secs(secs: f64) -> Duration {
    let backoff = Duration::try_from_secs_f64(secs.max(0.0))
        .unwrap_or(MAX_BACKOFF)
        .min(MAX_BACKOFF);
    if backoff == MAX_BACKOFF && secs != MAX_BACKOFF.as_secs_f64() {
        tracing::warn!(configured = secs, max_secs = MAX_BACKOFF.as_secs(), "Backoff clamped");
    }
    backoff
}

impl RetryPolicy {
    /// Total attempts allowed, the first one included.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds, fails fatally, or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. Each attempt is bounded by
    /// `timeout`; `backoff` elapses between consecutive attempts only.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Debug + fmt::Display,
    {
        let attempts = self.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match tokio::time::timeout(self.timeout, op(attempt)).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        tracing::info!(what, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(e)) if !e.is_retryable() => return Err(RetryError::Fatal(e)),
                Ok(Err(e)) => AttemptFailure::Failed(e),
                Err(_) => AttemptFailure::TimedOut(self.timeout),
            };

            if attempt >= attempts {
                tracing::warn!(what, attempt, error = %failure, "Retries exhausted");
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: failure,
                });
            }

            tracing::warn!(
                what,
                attempt,
                error = %failure,
                backoff_ms = self.backoff.as_millis() as u64,
                "Attempt failed, retrying"
            );
            tokio::time::sleep(self.backoff).await;
        }
    }
}
