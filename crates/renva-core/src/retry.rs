//! Bounded retry with exponential backoff for transient failures.
//!
//! Wraps individual persistence operations in the inbound pipeline. Up to
//! [`MAX_RETRIES`] attempts, backing off 1s/2s/4s between them, surfacing
//! the last error with operation context once exhausted.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Maximum number of attempts before giving up
pub const MAX_RETRIES: u32 = 3;

/// Base delay before the first retry; doubles on each subsequent attempt
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Error returned when an operation keeps failing after all retries
#[derive(Debug)]
pub struct RetryError<E> {
    pub operation: String,
    pub attempts: u32,
    pub last_error: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operation '{}' failed after {} attempts: {}",
            self.operation, self.attempts, self.last_error
        )
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.last_error)
    }
}

/// Retry `operation` with the default attempt count and backoff schedule.
pub async fn retry_operation<T, E, F, Fut>(
    operation: F,
    operation_name: &str,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    retry_operation_with(operation, operation_name, MAX_RETRIES, RETRY_BASE_DELAY).await
}

/// Retry `operation` up to `max_retries` times, sleeping
/// `base_delay * 2^(attempt-1)` between attempts.
pub async fn retry_operation_with<T, E, F, Fut>(
    operation: F,
    operation_name: &str,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_retries => {
                warn!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt, max_retries, operation_name, err
                );
                tokio::time::sleep(base_delay * 2u32.pow(attempt - 1)).await;
                attempt += 1;
            }
            Err(err) => {
                warn!(
                    "Attempt {}/{} failed for {}: {}",
                    attempt, max_retries, operation_name, err
                );
                return Err(RetryError {
                    operation: operation_name.to_string(),
                    attempts: max_retries,
                    last_error: err,
                });
            }
        }
    }
}
