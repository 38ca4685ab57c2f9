use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::Instant;

use super::errors::{PlatformError, Result};
use super::types::{
    PageRequest, PlatformBranch, PlatformClient, PlatformCommit, PlatformContributor,
    PlatformRepo,
};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default rate limits (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour = ~1.4/sec, we use 10/sec to allow bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// Longest pause honored after an upstream rate limit response.
    pub const MAX_PAUSE_SECS: u64 = 3600;
}

/// A shared API request budget.
///
/// Combines a governor token bucket with a "blocked until" instant set when
/// the platform reports an exhausted quota. Every clone shares both, so one
/// worker hitting the limit pauses all of them.
///
/// # Example
///
/// ```ignore
/// use ecosync::platform::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::new(10); // 10 requests per second
///
/// // Before each API call:
/// limiter.wait().await;
/// client.get_repo("org", "repo").await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
    blocked_until: Arc<Mutex<Option<Instant>>>,
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum requests per second (defaults to 1 if 0)
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
            blocked_until: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until a request is allowed.
    ///
    /// Sleeps through any active pause first, then waits for the token bucket.
    pub async fn wait(&self) {
        while let Some(until) = self.paused_until() {
            tokio::time::sleep_until(until).await;
        }
        self.inner.until_ready().await;
    }

    /// Block all callers until `reset_at`.
    ///
    /// An earlier pause never shortens a later one. Pauses are capped at
    /// [`rate_limits::MAX_PAUSE_SECS`].
    pub fn pause_until(&self, reset_at: DateTime<Utc>) {
        let delta = (reset_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
            .min(Duration::from_secs(rate_limits::MAX_PAUSE_SECS));
        if delta.is_zero() {
            return;
        }
        let until = Instant::now() + delta;

        let mut guard = self
            .blocked_until
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if guard.is_none_or(|current| current < until) {
            tracing::warn!(pause_ms = delta.as_millis() as u64, "Rate limited, pausing requests");
            *guard = Some(until);
        }
    }

    /// The instant requests are blocked until, if that is still in the future.
    pub fn paused_until(&self) -> Option<Instant> {
        let mut guard = self
            .blocked_until
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match *guard {
            Some(until) if until > Instant::now() => Some(until),
            Some(_) => {
                *guard = None;
                None
            }
            None => None,
        }
    }
}

/// A rate-limited wrapper around any `PlatformClient`.
///
/// All trait methods wait for the shared limiter before delegating to the
/// inner client. A `RateLimited` error from the inner client pauses the
/// limiter until the reported reset time.
///
/// # Example
///
/// ```ignore
/// use ecosync::platform::{ApiRateLimiter, RateLimitedClient, rate_limits};
/// use ecosync::github::GitHubClient;
///
/// let client = GitHubClient::new(&token, None)?;
/// let limiter = ApiRateLimiter::new(rate_limits::GITHUB_DEFAULT_RPS);
/// let client = RateLimitedClient::new(client, limiter);
/// ```
pub struct RateLimitedClient<C> {
    inner: C,
    limiter: ApiRateLimiter,
}

impl<C> RateLimitedClient<C> {
    /// Create a new rate-limited client wrapper sharing `limiter`.
    pub fn new(inner: C, limiter: ApiRateLimiter) -> Self {
        Self { inner, limiter }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Get the shared limiter.
    pub fn limiter(&self) -> &ApiRateLimiter {
        &self.limiter
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(PlatformError::RateLimited { reset_at }) = &result {
            self.limiter.pause_until(*reset_at);
        }
        result
    }
}

// Implement Clone if the inner client is Clone
impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

#[async_trait]
impl<C: PlatformClient> PlatformClient for RateLimitedClient<C> {
    async fn get_repo(&self, organization: &str, name: &str) -> Result<PlatformRepo> {
        self.limiter.wait().await;
        self.observe(self.inner.get_repo(organization, name).await)
    }

    async fn list_branches(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformBranch>> {
        self.limiter.wait().await;
        self.observe(self.inner.list_branches(organization, name, page).await)
    }

    async fn get_commit_time(
        &self,
        organization: &str,
        name: &str,
        sha: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        self.limiter.wait().await;
        self.observe(self.inner.get_commit_time(organization, name, sha).await)
    }

    async fn list_commits(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Vec<PlatformCommit>> {
        self.limiter.wait().await;
        self.observe(
            self.inner
                .list_commits(organization, name, branch, since, page)
                .await,
        )
    }

    async fn list_contributors(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformContributor>> {
        self.limiter.wait().await;
        self.observe(self.inner.list_contributors(organization, name, page).await)
    }
}
