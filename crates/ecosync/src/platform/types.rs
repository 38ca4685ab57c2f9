use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::errors::Result;

/// Upstream page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// A single page request (1-based page number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// The first page with the given page size.
    #[must_use]
    pub fn first(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
        }
    }

    /// The page after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            ..self
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

/// Repository metadata as reported by the platform.
#[derive(Debug, Clone)]
pub struct PlatformRepo {
    /// Owning organization or user.
    pub organization: String,
    /// Repository name.
    pub name: String,
    /// Default branch name.
    pub default_branch: String,
    /// Whether the repository is a fork.
    pub is_fork: bool,
    /// Star count.
    pub stars: Option<i32>,
    /// Fork count.
    pub forks: Option<i32>,
    /// Owner account type ("Organization", "User").
    pub owner_type: Option<String>,
    /// When the repo was created.
    pub created_at: Option<DateTime<Utc>>,
    /// When the repo was last updated.
    pub updated_at: Option<DateTime<Utc>>,
    /// When code was last pushed.
    pub pushed_at: Option<DateTime<Utc>>,
}

impl PlatformRepo {
    /// Get the full name (organization/name).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }
}

/// A branch and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformBranch {
    pub name: String,
    pub head_sha: String,
}

/// The platform account linked to a commit author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAuthor {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
}

/// A commit reachable from a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCommit {
    pub hash: String,
    /// Linked account, absent when the commit email maps to no account.
    pub author: Option<PlatformAuthor>,
    /// Author name from the commit itself.
    pub author_name: String,
    /// Committer timestamp, falling back to the author timestamp.
    pub committed_at: DateTime<Utc>,
}

/// Kind of account behind a contributor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    User,
    Bot,
    Organization,
    Other,
}

impl AccountType {
    /// Parse the platform's account type string.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "user" => Self::User,
            "bot" => Self::Bot,
            "organization" => Self::Organization,
            _ => Self::Other,
        }
    }
}

/// One entry of a repository's contributor list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContributor {
    pub id: i64,
    pub login: String,
    pub avatar_url: Option<String>,
    pub account_type: AccountType,
    /// Total contributions to the repository.
    pub contributions: i32,
}

/// Trait for code hosting platform clients.
///
/// List operations fetch exactly one page; callers drive pagination and stop
/// on the first empty page.
///
/// # Implementation Notes
///
/// Implementors should:
/// - Map undecodable bodies to `PlatformError::Malformed`
/// - Map 403/429 rate limit responses to `PlatformError::RateLimited`
/// - Treat an empty repository as an empty page, not an error
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Fetch repository metadata.
    async fn get_repo(&self, organization: &str, name: &str) -> Result<PlatformRepo>;

    /// Fetch one page of branches.
    async fn list_branches(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformBranch>>;

    /// Resolve the commit timestamp of a single commit.
    async fn get_commit_time(
        &self,
        organization: &str,
        name: &str,
        sha: &str,
    ) -> Result<Option<DateTime<Utc>>>;

    /// Fetch one page of commits reachable from `branch`, newer than `since` when set.
    async fn list_commits(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Vec<PlatformCommit>>;

    /// Fetch one page of contributors.
    async fn list_contributors(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformContributor>>;
}

#[async_trait]
impl<C: PlatformClient + ?Sized> PlatformClient for Arc<C> {
    async fn get_repo(&self, organization: &str, name: &str) -> Result<PlatformRepo> {
        (**self).get_repo(organization, name).await
    }

    async fn list_branches(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformBranch>> {
        (**self).list_branches(organization, name, page).await
    }

    async fn get_commit_time(
        &self,
        organization: &str,
        name: &str,
        sha: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        (**self).get_commit_time(organization, name, sha).await
    }

    async fn list_commits(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Vec<PlatformCommit>> {
        (**self)
            .list_commits(organization, name, branch, since, page)
            .await
    }

    async fn list_contributors(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<Vec<PlatformContributor>> {
        (**self).list_contributors(organization, name, page).await
    }
}
