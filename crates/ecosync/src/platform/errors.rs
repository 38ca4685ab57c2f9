use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Coarse classification of a failure, used for logging and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Network failure, server error or rate limit. Retried, then deferred to the next pass.
    Transient,
    /// Response body could not be decoded into the expected shape.
    Malformed,
    /// The repository (or another resource) no longer exists upstream.
    NotFound,
    /// Storage failure.
    Persistence,
    /// Missing credentials or unreachable storage at startup.
    Configuration,
}

impl ErrorClass {
    /// Stable lowercase name, used as the `error_class` log field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Malformed => "malformed",
            Self::NotFound => "not_found",
            Self::Persistence => "persistence",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when interacting with a code platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// API error from the platform.
    #[error("API error: {message}")]
    Api { status: Option<u16>, message: String },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    /// Authentication required or failed.
    #[error("Authentication required")]
    AuthRequired,

    /// Resource not found (repo, commit, etc.).
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Network or connection error.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The response could not be decoded.
    #[error("Malformed response: {message}")]
    Malformed { message: String },

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    /// Create an API error without a known HTTP status.
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            message: message.into(),
        }
    }

    /// Create an API error for an HTTP status.
    #[inline]
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create a not found error.
    #[inline]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an internal error.
    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error is a rate limit error.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if retrying the same request may succeed.
    ///
    /// Rate limits, network failures and 5xx responses are retryable. Client
    /// errors, missing resources and undecodable bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network { .. } => true,
            Self::Api { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Malformed { .. } => ErrorClass::Malformed,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::AuthRequired => ErrorClass::Configuration,
            Self::Api { .. }
            | Self::RateLimited { .. }
            | Self::Network { .. }
            | Self::Internal { .. } => ErrorClass::Transient,
        }
    }
}

/// Extract a short error message suitable for display.
///
/// Takes the first line of an error message, which is useful for errors
/// that include backtraces or multi-line details.
///
/// # Example
///
/// ```ignore
/// use ecosync::platform::short_error_message;
/// let error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
/// assert_eq!(short_error_message(&error), "file not found");
/// ```
#[inline]
pub fn short_error_message(e: &impl std::error::Error) -> String {
    let full = e.to_string();
    full.lines().next().unwrap_or(&full).to_string()
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;
