//! Platform-agnostic trait for the source-control hosting API.
//!
//! This module defines the `PlatformClient` trait that the sync engine talks
//! to, the strongly typed values it returns, the shared request budget and
//! the error taxonomy.
//!
//! # Example
//!
//! ```ignore
//! use ecosync::platform::{PageRequest, PlatformClient};
//!
//! async fn first_branches<C: PlatformClient>(client: &C) -> ecosync::platform::Result<()> {
//!     let branches = client.list_branches("rust-lang", "rust", PageRequest::first(100)).await?;
//!     for branch in branches {
//!         println!("{} @ {}", branch.name, branch.head_sha);
//!     }
//!     Ok(())
//! }
//! ```

mod errors;
mod rate_limit;
mod types;

pub use errors::{ErrorClass, PlatformError, Result, short_error_message};
pub use rate_limit::{ApiRateLimiter, RateLimitedClient, rate_limits};
pub use types::{
    AccountType, DEFAULT_PAGE_SIZE, PageRequest, PlatformAuthor, PlatformBranch, PlatformClient,
    PlatformCommit, PlatformContributor, PlatformRepo,
};
