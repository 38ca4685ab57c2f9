//! ecosync - incremental sync of open-source ecosystem activity.
//!
//! Keeps a relational store of tracked repositories, their branches, commits,
//! developers and contribution totals current with an upstream code host,
//! fetching only what changed since the last pass.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - storage backends
//! - `migrate` - schema migrations and [`connect_and_migrate`]
//! - `github` - the GitHub REST adapter
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ecosync::github::GitHubClient;
//! use ecosync::sync::{Shutdown, SyncEngine, SyncOptions};
//!
//! let db = ecosync::connect_and_migrate("sqlite://ecosync.db?mode=rwc").await?;
//! let client = Arc::new(GitHubClient::new(&token, None)?);
//! let engine = SyncEngine::new(client, Arc::new(db), SyncOptions::default());
//! let report = engine.run_pass(&Shutdown::never()).await?;
//! ```

pub mod db;
pub mod entity;
pub mod platform;
pub mod retry;
pub mod store;
pub mod sync;
pub mod views;
pub mod watermark;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use platform::{
    ApiRateLimiter, ErrorClass, PlatformClient, PlatformError, PlatformRepo, RateLimitedClient,
    rate_limits,
};
pub use store::{StoreError, TrackRequest};
pub use sync::{PassReport, Scheduler, Shutdown, SyncEngine, SyncError, SyncOptions};
pub use views::{View, ViewError, ViewRefresher};
pub use watermark::{DbWatermarkStore, MemoryWatermarkStore, WatermarkStore};
