//! GitHub API error types.

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::platform::PlatformError;

/// Fallback wait when a rate limit response carries no reset information.
const DEFAULT_RATE_LIMIT_WAIT_SECS: i64 = 60;

/// Errors that can occur when interacting with the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limit exceeded. Resets at {reset_at}")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected HTTP status {status} for {route}")]
    Status { status: u16, route: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

// Re-export the shared short_error_message function from platform module
pub use crate::platform::short_error_message;

/// Read the reset time from `retry-after` or `x-ratelimit-reset`.
pub fn rate_limit_reset(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(secs) = header("retry-after").and_then(|v| v.trim().parse::<i64>().ok()) {
        return Some(Utc::now() + Duration::seconds(secs));
    }

    header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
}

/// Map a non-success response status to an error.
///
/// 403 counts as a rate limit only when the quota headers say so; GitHub also
/// answers 403 for permission problems.
pub fn status_error(status: StatusCode, headers: &HeaderMap, route: &str) -> GitHubError {
    let quota_exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
        || headers.contains_key("retry-after");

    match status {
        StatusCode::TOO_MANY_REQUESTS => rate_limited(headers),
        StatusCode::FORBIDDEN if quota_exhausted => rate_limited(headers),
        StatusCode::UNAUTHORIZED => GitHubError::AuthRequired,
        StatusCode::NOT_FOUND => GitHubError::NotFound(route.to_string()),
        _ => GitHubError::Status {
            status: status.as_u16(),
            route: route.to_string(),
        },
    }
}

fn rate_limited(headers: &HeaderMap) -> GitHubError {
    GitHubError::RateLimited {
        reset_at: rate_limit_reset(headers)
            .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_RATE_LIMIT_WAIT_SECS)),
    }
}

/// Refine an octocrab error using the embedded status code.
pub fn from_octocrab(err: octocrab::Error, route: &str) -> GitHubError {
    match &err {
        octocrab::Error::GitHub { source, .. } => match source.status_code.as_u16() {
            401 => GitHubError::AuthRequired,
            404 => GitHubError::NotFound(route.to_string()),
            403 | 429 => GitHubError::RateLimited {
                reset_at: Utc::now() + Duration::seconds(DEFAULT_RATE_LIMIT_WAIT_SECS),
            },
            _ => GitHubError::Api(err),
        },
        octocrab::Error::Json { .. } | octocrab::Error::Serde { .. } => {
            GitHubError::Decode(err.to_string())
        }
        _ => GitHubError::Api(err),
    }
}

impl From<GitHubError> for PlatformError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::RateLimited { reset_at } => PlatformError::RateLimited { reset_at },
            GitHubError::AuthRequired => PlatformError::AuthRequired,
            GitHubError::NotFound(resource) => PlatformError::not_found(resource),
            GitHubError::Status { status, route } => {
                PlatformError::status(status, format!("HTTP {status} for {route}"))
            }
            GitHubError::Decode(msg) => PlatformError::malformed(msg),
            GitHubError::Http(e) => PlatformError::network(e.to_string()),
            GitHubError::Api(e) => PlatformError::api(e.to_string()),
            GitHubError::Internal(msg) => PlatformError::internal(msg),
        }
    }
}
