use std::time::Duration;

use thiserror::Error;

use crate::platform::{ErrorClass, PlatformError};
use crate::store::StoreError;
use crate::views::ViewError;

/// Errors that end one repository's sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Upstream request failed (after retries, when retryable).
    #[error("{context}: {source}")]
    Platform {
        context: String,
        #[source]
        source: PlatformError,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Aggregate refresh failed.
    #[error(transparent)]
    View(#[from] ViewError),

    /// Too many consecutive pages could not be decoded.
    #[error("{context}: {consecutive} consecutive malformed pages")]
    MalformedPages { context: String, consecutive: u32 },

    /// The repository exceeded its soft timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The repository task panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub fn platform(context: impl Into<String>, source: PlatformError) -> Self {
        Self::Platform {
            context: context.into(),
            source,
        }
    }

    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Platform { source, .. } => source.class(),
            Self::Store(e) => e.class(),
            Self::View(_) => ErrorClass::Persistence,
            Self::MalformedPages { .. } => ErrorClass::Malformed,
            Self::Timeout(_) | Self::Task(_) => ErrorClass::Transient,
        }
    }

    /// Whether this is an upstream "not found".
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_error_class() {
        let not_found = SyncError::platform("o/r", PlatformError::not_found("o/r"));
        assert_eq!(not_found.class(), ErrorClass::NotFound);
        assert!(not_found.is_not_found());

        let malformed = SyncError::MalformedPages {
            context: "o/r commits".to_string(),
            consecutive: 3,
        };
        assert_eq!(malformed.class(), ErrorClass::Malformed);
        assert!(malformed.to_string().contains("3 consecutive"));

        let store = SyncError::from(StoreError::invalid("x"));
        assert_eq!(store.class(), ErrorClass::Persistence);

        assert_eq!(
            SyncError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Transient
        );
    }
}
