//! Incremental commit fetching.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::platform::{PageRequest, PlatformClient, PlatformCommit};

use super::error::SyncError;
use super::paging::{PageGuard, fetch_with_retry};
use super::types::SyncOptions;

/// Lazy cursor over the commits of one branch newer than a watermark.
///
/// Each call to [`next_batch`](Self::next_batch) fetches the next upstream
/// page and returns the commits not already yielded. Iteration ends at the
/// first empty page. An undecodable page is skipped, and from then on
/// [`watermark`](Self::watermark) is `None`: the skipped commits are older
/// than later pages, so advancing past them would lose them.
pub struct CommitPages<'a, C: PlatformClient + ?Sized> {
    client: &'a C,
    organization: &'a str,
    repo: &'a str,
    branch: &'a str,
    since: Option<DateTime<Utc>>,
    options: &'a SyncOptions,
    page: PageRequest,
    guard: PageGuard,
    context: String,
    seen: HashSet<String>,
    newest: Option<DateTime<Utc>>,
    done: bool,
}

impl<'a, C: PlatformClient + ?Sized> CommitPages<'a, C> {
    /// Start a fetch. Without `since` the whole branch history is read.
    pub fn new(
        client: &'a C,
        organization: &'a str,
        repo: &'a str,
        branch: &'a str,
        since: Option<DateTime<Utc>>,
        options: &'a SyncOptions,
    ) -> Self {
        let context = format!("{organization}/{repo}@{branch} commits");
        Self {
            client,
            organization,
            repo,
            branch,
            since,
            options,
            page: PageRequest::first(options.page_size),
            guard: PageGuard::new(context.clone()),
            context,
            seen: HashSet::new(),
            newest: None,
            done: false,
        }
    }

    /// Fetch the next page of unseen commits.
    ///
    /// Returns `Ok(None)` once the upstream list is exhausted. A page whose
    /// commits were all seen before yields an empty batch, not `None`.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<PlatformCommit>>, SyncError> {
        loop {
            if self.done {
                return Ok(None);
            }

            let page = self.page;
            let result = fetch_with_retry(
                || {
                    self.client
                        .list_commits(self.organization, self.repo, self.branch, self.since, page)
                },
                &self.options.retry,
                &self.context,
            )
            .await;
            self.page = page.next();

            let Some(items) = self.guard.observe(result, page)? else {
                continue;
            };

            if items.is_empty() {
                self.done = true;
                return Ok(None);
            }

            let received = items.len();
            let fresh: Vec<PlatformCommit> = items
                .into_iter()
                .filter(|c| self.seen.insert(c.hash.clone()))
                .collect();

            if let Some(newest) = fresh.iter().map(|c| c.committed_at).max() {
                self.newest = Some(self.newest.map_or(newest, |w| w.max(newest)));
            }

            tracing::debug!(
                organization = self.organization,
                repo = self.repo,
                branch = self.branch,
                page = page.page,
                received,
                fresh = fresh.len(),
                "Fetched commit page"
            );
            return Ok(Some(fresh));
        }
    }

    /// Watermark safe to store: the newest commit time seen, or `None` if
    /// nothing was seen or a page was skipped.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        if self.guard.skipped() > 0 {
            return None;
        }
        self.newest
    }

    /// Newest commit time seen, regardless of skipped pages.
    pub fn newest_seen(&self) -> Option<DateTime<Utc>> {
        self.newest
    }

    /// Undecodable pages skipped so far.
    pub fn skipped_pages(&self) -> usize {
        self.guard.skipped() as usize
    }

    /// Distinct commits yielded so far.
    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

/// Fetch every commit on `branch` newer than `since`, deduplicated by hash.
///
/// Returns the commits and the new watermark (`None` when nothing was seen
/// or a page had to be skipped).
pub async fn fetch_new_commits<C: PlatformClient + ?Sized>(
    client: &C,
    organization: &str,
    repo: &str,
    branch: &str,
    since: Option<DateTime<Utc>>,
    options: &SyncOptions,
) -> Result<(Vec<PlatformCommit>, Option<DateTime<Utc>>), SyncError> {
    let mut pages = CommitPages::new(client, organization, repo, branch, since, options);
    let mut commits = Vec::new();
    while let Some(batch) = pages.next_batch().await? {
        commits.extend(batch);
    }
    Ok((commits, pages.watermark()))
}
