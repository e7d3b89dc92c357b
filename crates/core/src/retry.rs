//! Exponential backoff retry utility.
//!
//! Provides configurable retry with exponential backoff and jitter for
//! transient failures. Reserved for the Postgres persistence path — the
//! `DependencyDegraded`/`LlmDegraded` collaborators fail over instead of
//! retrying, so this module is never used to mask them.
//!
//! # Examples
//!
//! ```
//! use casino_core::retry::{RetryPolicy, retry_with_backoff};
//!
//! async fn fallible_operation() -> Result<String, std::io::Error> {
//!     Ok("success".to_string())
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let result = retry_with_backoff(
//!     || async { fallible_operation().await },
//!     RetryPolicy::default(),
//!     |err: &std::io::Error| err.kind() == std::io::ErrorKind::ConnectionRefused,
//! ).await?;
//! # let _ = result;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 means no retries, only initial attempt).
    pub max_retries: u32,
    /// Base delay in milliseconds for the first retry.
    pub base_delay_ms: u64,
    /// Maximum delay in milliseconds to cap exponential growth.
    pub max_delay_ms: u64,
    /// Whether to add random jitter to delays.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    /// max_retries: 3, base_delay_ms: 100, max_delay_ms: 5000, jitter: true.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 5000,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64, jitter: bool) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            jitter,
        }
    }

    /// More retries, shorter base delay. Use for writes that must eventually succeed.
    pub fn aggressive() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 50,
            max_delay_ms: 5000,
            jitter: true,
        }
    }

    /// Fewer retries, longer base delay. Use for non-critical background writes.
    pub fn gentle() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 3000,
            jitter: true,
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_delay_ms
            .saturating_mul(2_u64.saturating_pow(attempt));
        let capped_delay = exponential_delay.min(self.max_delay_ms);

        let final_delay = if self.jitter {
            let jitter_range = (capped_delay as f64 * 0.3) as u64;
            let jitter = if jitter_range > 0 {
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos() as u64;
                nanos % (jitter_range + 1)
            } else {
                0
            };
            capped_delay.saturating_add(jitter)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay)
    }
}

/// Retries an async operation with exponential backoff.
///
/// Only retries when `is_retryable` returns true for the error.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    mut operation: F,
    policy: RetryPolicy,
    is_retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                tracing::debug!(attempt, "operation succeeded");
                return Ok(result);
            }
            Err(error) => {
                if attempt >= policy.max_retries {
                    tracing::warn!(attempt, max_retries = policy.max_retries, "retries exhausted");
                    return Err(error);
                }

                if !is_retryable(&error) {
                    tracing::debug!(attempt, "error not retryable, failing immediately");
                    return Err(error);
                }

                let delay = policy.calculate_delay(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis(), "retrying after delay");

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
