//! Bounded retry with exponential backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::config::schema::{HealthCheckConfig, InclusionConfig};
use crate::lifecycle::Shutdown;

/// Calculate exponential backoff delay with jitter.
///
/// Attempt 0 has no delay; attempt `n` waits `base_ms * 2^(n-1)` capped at
/// `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let delay_ms = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms);

    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}

/// Attempt budget for operations retried until they succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay before the given (zero-based) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&HealthCheckConfig::default())
    }
}

impl From<&HealthCheckConfig> for RetryPolicy {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

/// Polling parameters for transaction inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InclusionPolicy {
    /// Fixed interval between receipt polls.
    pub poll_interval: Duration,
    /// Maximum number of polls.
    pub max_polls: u32,
    /// Overall deadline regardless of poll count.
    pub timeout: Duration,
}

impl Default for InclusionPolicy {
    fn default() -> Self {
        InclusionPolicy::from(&InclusionConfig::default())
    }
}

impl From<&InclusionConfig> for InclusionPolicy {
    fn from(config: &InclusionConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; carries the last error.
    Exhausted { attempts: u32, last: E },
    /// Shutdown was triggered while waiting.
    Cancelled,
}

/// Run `op` until it succeeds, the attempt budget is spent, or `shutdown`
/// fires.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    shutdown: &Shutdown,
    operation: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut listener = shutdown.subscribe();
    let mut attempt = 0;

    loop {
        let delay = policy.delay(attempt);
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = listener.cancelled() => return Err(RetryError::Cancelled),
            }
        }

        let result = tokio::select! {
            result = op(attempt) => result,
            _ = listener.cancelled() => return Err(RetryError::Cancelled),
        };

        attempt += 1;
        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => {
                tracing::warn!(
                    operation = operation,
                    attempts = attempt,
                    error = %e,
                    "Retry budget exhausted"
                );
                return Err(RetryError::Exhausted { attempts: attempt, last: e });
            }
            Err(e) => {
                tracing::debug!(
                    operation = operation,
                    attempt = attempt,
                    error = %e,
                    "Attempt failed, backing off"
                );
            }
        }
    }
}
