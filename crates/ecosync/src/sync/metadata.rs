//! Repository change detection and metadata snapshots.

use chrono::{DateTime, FixedOffset, Utc};

use crate::entity::repository::Model as RepositoryModel;
use crate::platform::{PlatformClient, PlatformRepo};

use super::error::SyncError;
use super::paging::fetch_with_retry;
use super::types::SyncOptions;

/// Whether a repository needs a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataStatus {
    Unchanged,
    Changed,
}

/// Fetch current upstream metadata for a tracked repository.
pub async fn fetch_metadata<C: PlatformClient + ?Sized>(
    client: &C,
    tracked: &RepositoryModel,
    options: &SyncOptions,
) -> Result<PlatformRepo, SyncError> {
    let context = tracked.full_name();
    fetch_with_retry(
        || client.get_repo(&tracked.organization, &tracked.name),
        &options.retry,
        &context,
    )
    .await
    .map_err(|e| SyncError::platform(context.clone(), e))
}

/// Compare upstream metadata with the stored row.
///
/// Changed when nothing was persisted yet, or when `updated_at` or
/// `pushed_at` is strictly newer than the stored value.
pub fn detect_change(tracked: &RepositoryModel, fetched: &PlatformRepo) -> MetadataStatus {
    if tracked.synced_at.is_none() {
        return MetadataStatus::Changed;
    }

    let newer = |stored: Option<DateTime<FixedOffset>>, upstream: Option<DateTime<Utc>>| {
        match (stored, upstream) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(stored), Some(upstream)) => upstream > stored.with_timezone(&Utc),
        }
    };

    if newer(tracked.updated_at, fetched.updated_at) || newer(tracked.pushed_at, fetched.pushed_at)
    {
        MetadataStatus::Changed
    } else {
        MetadataStatus::Unchanged
    }
}

/// Snapshot to persist: upstream facts with change-detection timestamps that
/// never move backwards.
pub fn merged_snapshot(tracked: &RepositoryModel, fetched: PlatformRepo) -> PlatformRepo {
    let keep_newest = |stored: Option<DateTime<FixedOffset>>, upstream: Option<DateTime<Utc>>| {
        let stored = stored.map(|t| t.with_timezone(&Utc));
        match (stored, upstream) {
            (Some(s), Some(u)) => Some(s.max(u)),
            (s, u) => u.or(s),
        }
    };

    PlatformRepo {
        updated_at: keep_newest(tracked.updated_at, fetched.updated_at),
        pushed_at: keep_newest(tracked.pushed_at, fetched.pushed_at),
        ..fetched
    }
}
