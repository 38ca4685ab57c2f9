//! GitHub REST v3 implementation of [`crate::platform::PlatformClient`].
//!
//! # Module Structure
//!
//! - [`error`] - Error types and status mapping
//! - [`types`] - Lenient wire types
//! - [`client`] - Client creation and the `PlatformClient` implementation
//! - [`convert`] - Conversion to platform types
//!
//! ```ignore
//! use ecosync::github::GitHubClient;
//! use ecosync::platform::{ApiRateLimiter, RateLimitedClient};
//!
//! let client = GitHubClient::new(&token, None)?;
//! let client = RateLimitedClient::new(client, ApiRateLimiter::new(10));
//! ```

mod client;
mod convert;
mod error;
mod types;

pub use client::{DEFAULT_API_URL, GitHubClient, create_client};
pub use convert::to_platform_repo;
pub use error::{GitHubError, rate_limit_reset, short_error_message, status_error};
pub use types::{GitHubAccount, GitHubBranch, GitHubCommit, GitHubContributor};
