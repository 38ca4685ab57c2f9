//! Sync orchestration.
//!
//! A pass walks the tracked set with bounded concurrency. For each
//! repository, under its key lock:
//!
//! 1. `whitelisted-fork` repositories are skipped.
//! 2. Upstream metadata is compared with the stored row; unchanged
//!    repositories write nothing.
//! 3. Branches are enumerated; each branch whose head is newer than its
//!    watermark has its new commits fetched and stored page by page, then
//!    the watermark is advanced.
//! 4. Contributor totals are replaced.
//! 5. The metadata snapshot is persisted, which marks the repository synced.
//!
//! A branch with a skipped commit page keeps its old watermark, and the
//! repository's metadata is not persisted, so the next pass fetches the
//! branch again from the old watermark.
//!
//! Steps 3 and 4 run under a soft timeout. A repository that times out or
//! fails keeps its old metadata, so the next pass sees it as changed again.
//! Failures stay inside the repository; the pass continues.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::entity::repository::Model as RepositoryModel;
use crate::platform::{ErrorClass, PlatformClient};
use crate::store::{self, StoreError};
use crate::views::ViewRefresher;
use crate::watermark::{DbWatermarkStore, WatermarkStore};

use super::branches::list_branches;
use super::commits::CommitPages;
use super::contributors::fetch_contributors;
use super::error::SyncError;
use super::locks::RepoLocks;
use super::metadata::{MetadataStatus, detect_change, fetch_metadata, merged_snapshot};
use super::scheduler::Shutdown;
use super::types::{PassReport, RefreshPolicy, RepoFailure, RepoOutcome, RepoStats, SyncOptions};

/// Drives sync passes against one platform and one database.
///
/// Clones share the client, watermark store, locks and view refresher.
pub struct SyncEngine<C: PlatformClient + ?Sized + 'static> {
    client: Arc<C>,
    db: Arc<DatabaseConnection>,
    watermarks: Arc<dyn WatermarkStore>,
    views: ViewRefresher,
    locks: RepoLocks,
    options: SyncOptions,
    first_pass: Arc<AtomicBool>,
}

impl<C: PlatformClient + ?Sized + 'static> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            db: Arc::clone(&self.db),
            watermarks: Arc::clone(&self.watermarks),
            views: self.views.clone(),
            locks: self.locks.clone(),
            options: self.options.clone(),
            first_pass: Arc::clone(&self.first_pass),
        }
    }
}

impl<C: PlatformClient + ?Sized + 'static> SyncEngine<C> {
    /// Create an engine with database-backed watermarks.
    pub fn new(client: Arc<C>, db: Arc<DatabaseConnection>, options: SyncOptions) -> Self {
        Self {
            client,
            watermarks: Arc::new(DbWatermarkStore::new(Arc::clone(&db))),
            views: ViewRefresher::new(Arc::clone(&db)),
            db,
            locks: RepoLocks::new(),
            options,
            first_pass: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Replace the watermark store.
    pub fn with_watermarks(mut self, watermarks: Arc<dyn WatermarkStore>) -> Self {
        self.watermarks = watermarks;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn views(&self) -> &ViewRefresher {
        &self.views
    }

    /// Run one pass over every tracked repository.
    ///
    /// Only a failure to read the tracked set fails the pass; per-repository
    /// failures are collected in the report. Once `shutdown` fires no further
    /// repositories are started, but those already running finish.
    pub async fn run_pass(&self, shutdown: &Shutdown) -> Result<PassReport, SyncError> {
        let pass_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_pass", %pass_id);
        self.run_pass_inner(pass_id, shutdown).instrument(span).await
    }

    async fn run_pass_inner(
        &self,
        pass_id: Uuid,
        shutdown: &Shutdown,
    ) -> Result<PassReport, SyncError> {
        let started = Instant::now();
        let mut report = PassReport::new(pass_id);

        let tracked = store::list_tracked(&self.db).await?;
        tracing::debug!(repositories = tracked.len(), "Starting pass");

        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut handles: Vec<(String, String, JoinHandle<Result<RepoOutcome, SyncError>>)> =
            Vec::with_capacity(tracked.len());

        for repo in tracked {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    report.interrupted = true;
                    break;
                }
                permit = Arc::clone(&semaphore).acquire_owned() => permit,
            };
            // The semaphore is never closed.
            let Ok(permit) = permit else {
                break;
            };

            report.visited += 1;
            let organization = repo.organization.clone();
            let name = repo.name.clone();
            let engine = self.clone();

            let handle = tokio::spawn(
                async move {
                    let _permit = permit;
                    engine.process(&repo).await
                }
                .in_current_span(),
            );
            handles.push((organization, name, handle));
        }

        for (organization, name, handle) in handles {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())));

            match result {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    let class = e.class();
                    tracing::warn!(
                        organization = %organization,
                        repo = %name,
                        error_class = %class,
                        error = %e,
                        "Repository sync failed"
                    );
                    report.record_failure(RepoFailure {
                        organization,
                        name,
                        class,
                        message: e.to_string(),
                    });
                }
            }
        }

        let first_pass = self.first_pass.swap(false, Ordering::SeqCst);
        if self.options.refresh == RefreshPolicy::PerPass && (report.has_writes() || first_pass) {
            match self.views.refresh_all().await {
                Ok(views) => {
                    report.refreshed = views.iter().map(|v| v.name().to_string()).collect();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Aggregate refresh failed");
                }
            }
        }

        report.elapsed = started.elapsed();
        tracing::info!(
            visited = report.visited,
            changed = report.changed,
            unchanged = report.unchanged,
            skipped = report.skipped,
            failed = report.failed,
            commits_inserted = report.commits_inserted,
            contributions_written = report.contributions_written,
            interrupted = report.interrupted,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Sync pass complete"
        );

        Ok(report)
    }

    /// Sync one repository and apply the per-repository refresh policy.
    async fn process(&self, tracked: &RepositoryModel) -> Result<RepoOutcome, SyncError> {
        let outcome = self.sync_repository(tracked).await?;

        if self.options.refresh == RefreshPolicy::PerRepository
            && matches!(outcome, RepoOutcome::Synced(_))
            && let Err(e) = self.views.refresh_all().await
        {
            tracing::error!(
                organization = %tracked.organization,
                repo = %tracked.name,
                error = %e,
                "Aggregate refresh failed"
            );
        }

        Ok(outcome)
    }

    /// Run the full workflow for one repository.
    ///
    /// The stored row is re-read under the repository lock, so a concurrent
    /// re-classification is honored.
    #[tracing::instrument(
        skip_all,
        fields(organization = %tracked.organization, repo = %tracked.name)
    )]
    pub async fn sync_repository(
        &self,
        tracked: &RepositoryModel,
    ) -> Result<RepoOutcome, SyncError> {
        let _guard = self.locks.lock(&tracked.organization, &tracked.name).await;

        let current = store::find(&self.db, &tracked.organization, &tracked.name)
            .await?
            .ok_or_else(|| StoreError::repository_not_found(&tracked.organization, &tracked.name))?;

        if !current.repo_type.collects_activity() {
            tracing::debug!(repo_type = %current.repo_type, "Skipping repository");
            return Ok(RepoOutcome::Skipped);
        }

        let fetched = fetch_metadata(self.client.as_ref(), &current, &self.options).await?;
        if detect_change(&current, &fetched) == MetadataStatus::Unchanged {
            tracing::debug!("Repository unchanged");
            return Ok(RepoOutcome::Unchanged);
        }

        let started = Instant::now();
        let timeout = self.options.repo_timeout;
        let stats = tokio::time::timeout(
            timeout,
            self.collect_activity(&current, &fetched.default_branch),
        )
        .await
        .map_err(|_| SyncError::Timeout(timeout))??;

        if !stats.is_complete() {
            tracing::warn!(
                pages_skipped = stats.pages_skipped,
                commits_inserted = stats.commits_inserted,
                error_class = %ErrorClass::Malformed,
                "Repository partially synced; retrying next pass"
            );
            return Ok(RepoOutcome::Synced(stats));
        }

        let snapshot = merged_snapshot(&current, fetched);
        store::persist_metadata(&self.db, &current, &snapshot, Utc::now()).await?;

        tracing::info!(
            branches_fetched = stats.branches_fetched,
            branches_skipped = stats.branches_skipped,
            commits_inserted = stats.commits_inserted,
            contributions_written = stats.contributions_written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Repository synced"
        );

        Ok(RepoOutcome::Synced(stats))
    }

    /// Branches, commits and contributors for a changed repository.
    async fn collect_activity(
        &self,
        repo: &RepositoryModel,
        default_branch: &str,
    ) -> Result<RepoStats, SyncError> {
        let organization = repo.organization.as_str();
        let name = repo.name.as_str();
        let client = self.client.as_ref();
        let mut stats = RepoStats::default();

        let heads = list_branches(client, organization, name, default_branch, &self.options).await?;

        for head in heads {
            let watermark = self.watermarks.get(organization, name, &head.name).await?;

            if let (Some(head_time), Some(mark)) = (head.head_commit_time, watermark)
                && head_time <= mark
            {
                tracing::debug!(branch = %head.name, "Branch has no new commits");
                stats.branches_skipped += 1;
                continue;
            }

            match self.sync_branch(organization, name, &head.name, watermark).await {
                Ok((inserted, skipped)) => {
                    stats.branches_fetched += 1;
                    stats.commits_inserted += inserted;
                    stats.pages_skipped += skipped;
                }
                Err(e) if e.is_not_found() && head.name != default_branch => {
                    tracing::debug!(branch = %head.name, "Branch disappeared during sync");
                    stats.branches_skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        let contributors = fetch_contributors(client, organization, name, &self.options).await?;
        stats.contributions_written =
            store::upsert_contributions(&self.db, organization, name, &contributors).await?;

        Ok(stats)
    }

    /// Store new commits on one branch, then advance its watermark.
    ///
    /// Returns the rows inserted and the pages skipped. With skipped pages
    /// the watermark is left where it was.
    async fn sync_branch(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<(u64, usize), SyncError> {
        let mut pages = CommitPages::new(
            self.client.as_ref(),
            organization,
            repo,
            branch,
            since,
            &self.options,
        );

        let mut inserted = 0u64;
        while let Some(batch) = pages.next_batch().await? {
            inserted += store::insert_commits(&self.db, organization, repo, branch, &batch).await?;
        }

        if let Some(newest) = pages.watermark() {
            self.watermarks.set(organization, repo, branch, newest).await?;
        } else if pages.skipped_pages() > 0 {
            tracing::warn!(
                branch,
                pages_skipped = pages.skipped_pages(),
                newest_seen = ?pages.newest_seen(),
                "Holding watermark after skipped pages"
            );
        }

        tracing::debug!(
            branch,
            seen = pages.seen(),
            inserted,
            "Branch synced"
        );
        Ok((inserted, pages.skipped_pages()))
    }
}
