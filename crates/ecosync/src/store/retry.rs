use std::future::Future;
use std::time::Duration;

use crate::platform::short_error_message;
use crate::retry::{RetryConfig, with_retry};

use super::errors::{Result, StoreError};

/// Default number of retry attempts for write operations.
pub const DEFAULT_WRITE_RETRIES: usize = 3;

/// Default initial backoff delay in milliseconds for write retries.
pub const DEFAULT_WRITE_BACKOFF_MS: u64 = 100;

/// Backoff used for storage writes.
pub fn write_retry_config() -> RetryConfig {
    RetryConfig::new(
        Duration::from_millis(DEFAULT_WRITE_BACKOFF_MS),
        Duration::from_secs(2),
        DEFAULT_WRITE_RETRIES,
    )
}

/// Run a write, retrying locked/busy/connection errors with backoff.
pub(crate) async fn retry_write<T, F, Fut>(operation: F, context: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(
        operation,
        &write_retry_config(),
        StoreError::is_retryable,
        short_error_message,
        context,
    )
    .await
}
