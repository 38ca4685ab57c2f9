//! Storage operations for the synchronized tables.
//!
//! Writes are idempotent upserts keyed on natural keys and retry transient
//! database errors (locked, busy, dropped connections) with backoff.

mod commits;
mod contributors;
mod errors;
mod repositories;
mod retry;

pub use commits::{insert_commits, upsert_developers};
pub use contributors::upsert_contributions;
pub use errors::{Result, StoreError};
pub use repositories::{TrackRequest, find, list_tracked, persist_metadata, track};
pub use retry::{DEFAULT_WRITE_BACKOFF_MS, DEFAULT_WRITE_RETRIES, write_retry_config};
pub(crate) use retry::retry_write;
