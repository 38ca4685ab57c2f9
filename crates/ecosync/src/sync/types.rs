//! Shared sync types and constants.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::platform::{DEFAULT_PAGE_SIZE, ErrorClass};
use crate::retry::RetryConfig;

/// Default number of repositories synced concurrently.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default soft timeout for one repository's activity fetch.
pub const DEFAULT_REPO_TIMEOUT: Duration = Duration::from_secs(600);

/// Default pause between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

/// Consecutive undecodable pages tolerated before a fetch is abandoned.
pub const MAX_CONSECUTIVE_MALFORMED_PAGES: u32 = 3;

/// When derived aggregates are recomputed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Once at the end of each pass that wrote anything (and after the first pass).
    #[default]
    PerPass,
    /// After every repository whose sync wrote anything.
    PerRepository,
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerPass => f.write_str("per-pass"),
            Self::PerRepository => f.write_str("per-repository"),
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-pass" | "pass" => Ok(Self::PerPass),
            "per-repository" | "per-repo" | "repository" => Ok(Self::PerRepository),
            other => Err(format!(
                "unknown refresh policy '{other}' (expected per-pass or per-repository)"
            )),
        }
    }
}

/// Options for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Repositories processed concurrently.
    pub concurrency: usize,
    /// Upstream page size.
    pub page_size: u32,
    /// Soft timeout for one repository's branch/commit/contributor work.
    pub repo_timeout: Duration,
    /// When aggregates are recomputed.
    pub refresh: RefreshPolicy,
    /// Backoff for retryable upstream errors.
    pub retry: RetryConfig,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_size: DEFAULT_PAGE_SIZE,
            repo_timeout: DEFAULT_REPO_TIMEOUT,
            refresh: RefreshPolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// A branch and the time of its head commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHead {
    pub name: String,
    /// `None` when the head commit time could not be resolved.
    pub head_commit_time: Option<DateTime<Utc>>,
}

/// Counters for one repository whose activity was synced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStats {
    /// Branches whose commits were fetched.
    pub branches_fetched: usize,
    /// Branches skipped because the head is not newer than the watermark.
    pub branches_skipped: usize,
    /// Commit rows inserted.
    pub commits_inserted: u64,
    /// Contribution rows written.
    pub contributions_written: u64,
    /// Undecodable commit pages skipped. Their branches keep the old
    /// watermark and the repository is left unsynced.
    pub pages_skipped: usize,
}

impl RepoStats {
    /// Whether every commit page decoded.
    pub fn is_complete(&self) -> bool {
        self.pages_skipped == 0
    }
}

/// What happened to one repository in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// Not measured (`whitelisted-fork`).
    Skipped,
    /// Upstream timestamps did not move; nothing written.
    Unchanged,
    /// Activity and metadata were written.
    Synced(RepoStats),
}

/// A repository whose cycle failed.
#[derive(Debug, Clone)]
pub struct RepoFailure {
    pub organization: String,
    pub name: String,
    pub class: ErrorClass,
    pub message: String,
}

impl fmt::Display for RepoFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} [{}]: {}",
            self.organization, self.name, self.class, self.message
        )
    }
}

/// Summary of one pass over the tracked set.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub pass_id: Uuid,
    /// Repositories started.
    pub visited: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub commits_inserted: u64,
    pub contributions_written: u64,
    /// Synced repositories with skipped pages, retried next pass.
    pub partial: usize,
    pub errors: Vec<RepoFailure>,
    /// Views recomputed at the end of the pass.
    pub refreshed: Vec<String>,
    /// The stop signal arrived before every repository was started.
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl PassReport {
    pub fn new(pass_id: Uuid) -> Self {
        Self {
            pass_id,
            visited: 0,
            changed: 0,
            unchanged: 0,
            skipped: 0,
            failed: 0,
            commits_inserted: 0,
            contributions_written: 0,
            partial: 0,
            errors: Vec::new(),
            refreshed: Vec::new(),
            interrupted: false,
            elapsed: Duration::ZERO,
        }
    }

    /// Fold one repository outcome into the totals.
    pub fn record(&mut self, outcome: &RepoOutcome) {
        match outcome {
            RepoOutcome::Skipped => self.skipped += 1,
            RepoOutcome::Unchanged => self.unchanged += 1,
            RepoOutcome::Synced(stats) => {
                self.changed += 1;
                self.commits_inserted += stats.commits_inserted;
                self.contributions_written += stats.contributions_written;
                if !stats.is_complete() {
                    self.partial += 1;
                }
            }
        }
    }

    pub fn record_failure(&mut self, failure: RepoFailure) {
        self.failed += 1;
        self.errors.push(failure);
    }

    /// Whether anything was written during the pass.
    pub fn has_writes(&self) -> bool {
        self.changed > 0
    }
}
