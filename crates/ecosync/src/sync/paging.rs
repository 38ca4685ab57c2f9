//! Shared page-fetch plumbing: retries and malformed-page accounting.

use std::future::Future;

use crate::platform::{self, ErrorClass, PageRequest, PlatformError, short_error_message};
use crate::retry::{RetryConfig, with_retry};

use super::error::SyncError;
use super::types::MAX_CONSECUTIVE_MALFORMED_PAGES;

/// Call the platform, retrying rate limits, network failures and 5xx.
pub(crate) async fn fetch_with_retry<T, F, Fut>(
    operation: F,
    retry: &RetryConfig,
    context: &str,
) -> platform::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = platform::Result<T>>,
{
    with_retry(
        operation,
        retry,
        PlatformError::is_retryable,
        short_error_message,
        context,
    )
    .await
}

/// Tracks consecutive malformed pages for one paginated fetch.
#[derive(Debug)]
pub(crate) struct PageGuard {
    context: String,
    consecutive_malformed: u32,
    skipped: u32,
}

impl PageGuard {
    pub(crate) fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            consecutive_malformed: 0,
            skipped: 0,
        }
    }

    /// Malformed pages skipped so far.
    pub(crate) fn skipped(&self) -> u32 {
        self.skipped
    }

    /// Interpret a page result.
    ///
    /// Returns `Ok(Some(items))` for a decoded page and `Ok(None)` for a
    /// malformed page that should be skipped. The third malformed page in a
    /// row, and any other error, aborts the fetch.
    pub(crate) fn observe<T>(
        &mut self,
        result: platform::Result<Vec<T>>,
        page: PageRequest,
    ) -> Result<Option<Vec<T>>, SyncError> {
        match result {
            Ok(items) => {
                self.consecutive_malformed = 0;
                Ok(Some(items))
            }
            Err(e) if e.class() == ErrorClass::Malformed => {
                self.consecutive_malformed += 1;
                self.skipped += 1;
                tracing::warn!(
                    context = %self.context,
                    page = page.page,
                    consecutive = self.consecutive_malformed,
                    error_class = %ErrorClass::Malformed,
                    "Skipping malformed page: {}",
                    short_error_message(&e)
                );
                if self.consecutive_malformed >= MAX_CONSECUTIVE_MALFORMED_PAGES {
                    return Err(SyncError::MalformedPages {
                        context: self.context.clone(),
                        consecutive: self.consecutive_malformed,
                    });
                }
                Ok(None)
            }
            Err(e) => Err(SyncError::platform(self.context.clone(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_pages_are_skipped_until_the_limit() {
        let mut guard = PageGuard::new("o/r commits");
        let page = PageRequest::first(10);

        for _ in 0..2 {
            let skipped = guard
                .observe::<u32>(Err(PlatformError::malformed("bad json")), page)
                .unwrap();
            assert!(skipped.is_none());
        }

        let err = guard
            .observe::<u32>(Err(PlatformError::malformed("bad json")), page)
            .unwrap_err();
        assert!(matches!(err, SyncError::MalformedPages { consecutive: 3, .. }));
    }

    #[test]
    fn a_good_page_resets_the_counter() {
        let mut guard = PageGuard::new("o/r commits");
        let page = PageRequest::first(10);

        for _ in 0..2 {
            assert!(
                guard
                    .observe::<u32>(Err(PlatformError::malformed("bad")), page)
                    .unwrap()
                    .is_none()
            );
        }
        assert_eq!(guard.observe(Ok(vec![1u32]), page).unwrap(), Some(vec![1]));
        assert!(
            guard
                .observe::<u32>(Err(PlatformError::malformed("bad")), page)
                .unwrap()
                .is_none()
        );
        assert_eq!(guard.skipped(), 3);
    }

    #[test]
    fn other_errors_abort_immediately() {
        let mut guard = PageGuard::new("o/r branches");
        let err = guard
            .observe::<u32>(Err(PlatformError::not_found("o/r")), PageRequest::first(10))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
