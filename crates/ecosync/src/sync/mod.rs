//! Incremental repository sync.
//!
//! # Module Structure
//!
//! - [`types`] - Options, outcomes and the pass report
//! - [`engine`] - The per-repository workflow and pass orchestration
//! - [`scheduler`] - Repeating passes and the stop signal
//! - [`branches`], [`commits`], [`contributors`], [`metadata`] - Upstream fetchers
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use ecosync::sync::{Scheduler, SyncEngine, SyncOptions, shutdown_channel};
//!
//! let engine = SyncEngine::new(Arc::new(client), Arc::new(db), SyncOptions::default());
//! let (trigger, shutdown) = shutdown_channel();
//! let passes = Scheduler::new(engine, interval).run(shutdown).await;
//! ```

pub mod branches;
pub mod commits;
pub mod contributors;
pub mod engine;
mod error;
mod locks;
pub mod metadata;
mod paging;
pub mod scheduler;
mod types;

pub use error::SyncError;
pub use locks::RepoLocks;

pub use types::{
    BranchHead, PassReport, RefreshPolicy, RepoFailure, RepoOutcome, RepoStats, SyncOptions,
};

pub use types::{
    DEFAULT_CONCURRENCY, DEFAULT_INTERVAL, DEFAULT_REPO_TIMEOUT, MAX_CONSECUTIVE_MALFORMED_PAGES,
};

pub use branches::list_branches;
pub use commits::{CommitPages, fetch_new_commits};
pub use contributors::fetch_contributors;
pub use engine::SyncEngine;
pub use metadata::{MetadataStatus, detect_change, fetch_metadata, merged_snapshot};
pub use scheduler::{Scheduler, Shutdown, ShutdownTrigger, shutdown_channel};
