//! Shared fixtures: an in-process platform and database setup.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ecosync::connect_and_migrate;
use ecosync::platform::{
    AccountType, PageRequest, PlatformAuthor, PlatformBranch, PlatformClient, PlatformCommit,
    PlatformContributor, PlatformError, PlatformRepo, Result,
};
use ecosync::retry::RetryConfig;
use ecosync::sync::SyncOptions;
use sea_orm::DatabaseConnection;

/// Create an in-memory SQLite database with migrations applied.
pub async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    Arc::new(db)
}

/// Options with fast, bounded retries for tests.
pub fn test_options() -> SyncOptions {
    SyncOptions {
        retry: RetryConfig::new(Duration::from_millis(1), Duration::from_millis(5), 2)
            .with_jitter(false),
        ..SyncOptions::default()
    }
}

pub fn ts(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

/// Retryable upstream failures the fake can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outage {
    ServerError,
    Network,
    RateLimited,
}

impl Outage {
    fn error(self) -> PlatformError {
        match self {
            Outage::ServerError => PlatformError::status(503, "service unavailable"),
            Outage::Network => PlatformError::network("connection reset by peer"),
            Outage::RateLimited => PlatformError::RateLimited {
                reset_at: Utc::now(),
            },
        }
    }
}

type RepoKey = (String, String);
type BranchKey = (String, String, String);

fn repo_key(organization: &str, name: &str) -> RepoKey {
    (organization.to_string(), name.to_string())
}

fn branch_key(organization: &str, name: &str, branch: &str) -> BranchKey {
    (organization.to_string(), name.to_string(), branch.to_string())
}

#[derive(Default)]
struct State {
    repos: HashMap<RepoKey, PlatformRepo>,
    /// Branch name -> commits, in insertion order.
    commits: HashMap<RepoKey, Vec<(String, Vec<PlatformCommit>)>>,
    contributors: HashMap<RepoKey, Vec<PlatformContributor>>,
    /// Commit pages answered with an undecodable body.
    malformed_commit_pages: HashSet<(BranchKey, u32)>,
    /// Branches listed but gone by the time their commits are requested.
    vanished_branches: HashSet<BranchKey>,
    /// Commit requests still to fail per branch, and how.
    commit_outages: HashMap<BranchKey, (Outage, usize)>,
    commit_delay: Option<Duration>,
    calls: Vec<String>,
}

/// A fake code host that records every call.
///
/// `since` is honored inclusively and commits are served newest first, like
/// the real commits endpoint.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Add a repository whose default branch is `main`.
    pub fn add_repo(&self, organization: &str, name: &str, updated_at: DateTime<Utc>) {
        let repo = PlatformRepo {
            organization: organization.to_string(),
            name: name.to_string(),
            default_branch: "main".to_string(),
            is_fork: false,
            stars: Some(7),
            forks: Some(1),
            owner_type: Some("Organization".to_string()),
            created_at: Some(ts(1, 0)),
            updated_at: Some(updated_at),
            pushed_at: Some(updated_at),
        };
        let mut state = self.state();
        state.repos.insert(repo_key(organization, name), repo);
        state
            .commits
            .entry(repo_key(organization, name))
            .or_default();
    }

    /// Move the repository's change-detection timestamps.
    pub fn touch(&self, organization: &str, name: &str, at: DateTime<Utc>) {
        let mut state = self.state();
        if let Some(repo) = state.repos.get_mut(&repo_key(organization, name)) {
            repo.updated_at = Some(at);
            repo.pushed_at = Some(at);
        }
    }

    /// Add a commit to `branch`, creating the branch if needed.
    pub fn push_commit(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        hash: &str,
        author: Option<(i64, &str)>,
        at: DateTime<Utc>,
    ) {
        let commit = PlatformCommit {
            hash: hash.to_string(),
            author: author.map(|(id, login)| PlatformAuthor {
                id,
                login: login.to_string(),
                avatar_url: None,
            }),
            author_name: author.map_or("anonymous", |(_, login)| login).to_string(),
            committed_at: at,
        };

        let mut state = self.state();
        let branches = state.commits.entry(repo_key(organization, name)).or_default();
        match branches.iter_mut().find(|(b, _)| b == branch) {
            Some((_, commits)) => commits.push(commit),
            None => branches.push((branch.to_string(), vec![commit])),
        }
    }

    pub fn delete_branch(&self, organization: &str, name: &str, branch: &str) {
        let mut state = self.state();
        if let Some(branches) = state.commits.get_mut(&repo_key(organization, name)) {
            branches.retain(|(b, _)| b != branch);
        }
    }

    pub fn vanish_branch(&self, organization: &str, name: &str, branch: &str) {
        self.state()
            .vanished_branches
            .insert(branch_key(organization, name, branch));
    }

    pub fn set_contributors(&self, organization: &str, name: &str, entries: &[(i64, &str, &str, i32)]) {
        let contributors = entries
            .iter()
            .map(|(id, login, kind, contributions)| PlatformContributor {
                id: *id,
                login: login.to_string(),
                avatar_url: None,
                account_type: AccountType::parse(kind),
                contributions: *contributions,
            })
            .collect();
        self.state()
            .contributors
            .insert(repo_key(organization, name), contributors);
    }

    pub fn malformed_commit_page(&self, organization: &str, name: &str, branch: &str, page: u32) {
        self.state()
            .malformed_commit_pages
            .insert((branch_key(organization, name, branch), page));
    }

    /// Fail the next `times` commit requests on `branch` with `outage`.
    pub fn fail_commit_requests(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        outage: Outage,
        times: usize,
    ) {
        self.state()
            .commit_outages
            .insert(branch_key(organization, name, branch), (outage, times));
    }

    pub fn clear_outages(&self) {
        self.state().commit_outages.clear();
    }

    pub fn clear_malformed(&self) {
        self.state().malformed_commit_pages.clear();
    }

    pub fn set_commit_delay(&self, delay: Option<Duration>) {
        self.state().commit_delay = delay;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Number of recorded calls to `method`.
    pub fn count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(method))
            .count()
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Vec<T> {
    let per_page = page.per_page as usize;
    let start = (page.page as usize - 1) * per_page;
    items.iter().skip(start).take(per_page).cloned().collect()
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn get_repo(&self, organization: &str, name: &str) -> Result<PlatformRepo> {
        self.record(format!("get_repo {organization}/{name}"));
        self.state()
            .repos
            .get(&repo_key(organization, name))
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("{organization}/{name}")))
    }

    async fn list_branches(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformBranch>> {
        self.record(format!("list_branches {organization}/{name} page={}", page.page));
        let state = self.state();
        let branches: Vec<PlatformBranch> = state
            .commits
            .get(&repo_key(organization, name))
            .map(|branches| {
                branches
                    .iter()
                    .filter_map(|(branch, commits)| {
                        commits.iter().max_by_key(|c| c.committed_at).map(|head| {
                            PlatformBranch {
                                name: branch.clone(),
                                head_sha: head.hash.clone(),
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(paginate(&branches, page))
    }

    async fn get_commit_time(
        &self,
        organization: &str,
        name: &str,
        sha: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        self.record(format!("get_commit_time {organization}/{name} {sha}"));
        let state = self.state();
        Ok(state
            .commits
            .get(&repo_key(organization, name))
            .and_then(|branches| {
                branches
                    .iter()
                    .flat_map(|(_, commits)| commits.iter())
                    .find(|c| c.hash == sha)
                    .map(|c| c.committed_at)
            }))
    }

    async fn list_commits(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Vec<PlatformCommit>> {
        self.record(format!(
            "list_commits {organization}/{name}@{branch} page={}",
            page.page
        ));

        let delay = self.state().commit_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let key = branch_key(organization, name, branch);
        if let Some((outage, remaining)) = state.commit_outages.get_mut(&key)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(outage.error());
        }
        if state.vanished_branches.contains(&key) {
            return Err(PlatformError::not_found(format!(
                "{organization}/{name}@{branch}"
            )));
        }
        if state.malformed_commit_pages.contains(&(key, page.page)) {
            return Err(PlatformError::malformed("expected value at line 1 column 1"));
        }

        let mut commits: Vec<PlatformCommit> = state
            .commits
            .get(&repo_key(organization, name))
            .and_then(|branches| branches.iter().find(|(b, _)| b == branch))
            .map(|(_, commits)| {
                commits
                    .iter()
                    .filter(|c| since.is_none_or(|s| c.committed_at >= s))
                    .cloned()
                    .collect()
            })
            .ok_or_else(|| PlatformError::not_found(format!("{organization}/{name}@{branch}")))?;
        commits.sort_by(|a, b| b.committed_at.cmp(&a.committed_at));

        Ok(paginate(&commits, page))
    }

    async fn list_contributors(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformContributor>> {
        self.record(format!("list_contributors {organization}/{name} page={}", page.page));
        let contributors = self
            .state()
            .contributors
            .get(&repo_key(organization, name))
            .cloned()
            .unwrap_or_default();
        Ok(paginate(&contributors, page))
    }
}
