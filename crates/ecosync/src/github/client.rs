//! GitHub API client creation and request plumbing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use octocrab::Octocrab;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::convert::{
    convert_page, to_platform_branch, to_platform_commit, to_platform_contributor,
    to_platform_repo,
};
use super::error::{GitHubError, from_octocrab, status_error};
use super::types::{GitHubBranch, GitHubCommit, GitHubContributor};
use crate::platform::{
    self, PageRequest, PlatformBranch, PlatformClient, PlatformCommit, PlatformContributor,
    PlatformError, PlatformRepo,
};

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Create an authenticated Octocrab instance from a GitHub token.
pub fn create_client(token: &str, api_url: &str) -> Result<Octocrab, GitHubError> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .base_uri(api_url)
        .map_err(GitHubError::Api)?
        .build()
        .map_err(GitHubError::Api)
}

/// GitHub API client implementing the PlatformClient trait.
///
/// Repository metadata goes through `Octocrab`; list endpoints are fetched
/// with a shared `reqwest` client so that every page is decoded leniently
/// and empty repositories (409/204) read as empty pages.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<Octocrab>,
    /// The authentication token, stored for raw requests.
    token: Arc<String>,
    /// Shared HTTP client for list requests.
    http_client: reqwest::Client,
    /// API base URL without trailing slash.
    api_url: Arc<String>,
}

impl GitHubClient {
    /// Create a new GitHub client from an authentication token.
    ///
    /// `api_url` defaults to [`DEFAULT_API_URL`].
    pub fn new(token: &str, api_url: Option<&str>) -> Result<Self, GitHubError> {
        let api_url = api_url
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();
        let client = create_client(token, &api_url)?;
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("ecosync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(client),
            token: Arc::new(token.to_string()),
            http_client,
            api_url: Arc::new(api_url),
        })
    }

    /// Get a reference to the inner Octocrab client.
    pub fn inner(&self) -> &Octocrab {
        &self.inner
    }

    /// The API base URL this client talks to.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GET `route` and decode the body.
    ///
    /// Returns `None` for 204 No Content and 409 Conflict, which GitHub uses
    /// for repositories without any commits.
    async fn get_json<T: DeserializeOwned>(
        &self,
        route: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, GitHubError> {
        let url = format!("{}{}", self.api_url, route);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .header("Authorization", format!("Bearer {}", self.token.as_str()))
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NO_CONTENT | StatusCode::CONFLICT => {
                tracing::debug!(route, status = status.as_u16(), "Empty repository response");
                Ok(None)
            }
            s if s.is_success() => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body)
                    .map(Some)
                    .map_err(|e| GitHubError::Decode(format!("{route}: {e}")))
            }
            _ => Err(status_error(status, response.headers(), route)),
        }
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        route: &str,
        mut query: Vec<(&str, String)>,
        page: PageRequest,
    ) -> Result<Vec<T>, GitHubError> {
        query.push(("per_page", page.per_page.to_string()));
        query.push(("page", page.page.to_string()));
        Ok(self.get_json(route, &query).await?.unwrap_or_default())
    }
}

#[async_trait]
impl PlatformClient for GitHubClient {
    async fn get_repo(&self, organization: &str, name: &str) -> platform::Result<PlatformRepo> {
        let route = format!("/repos/{organization}/{name}");
        let repo = self
            .inner
            .repos(organization, name)
            .get()
            .await
            .map_err(|e| from_octocrab(e, &route))?;
        Ok(to_platform_repo(&repo))
    }

    async fn list_branches(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> platform::Result<Vec<PlatformBranch>> {
        let route = format!("/repos/{organization}/{name}/branches");
        let items: Vec<GitHubBranch> = self.get_page(&route, Vec::new(), page).await?;
        Ok(convert_page(items, to_platform_branch)?)
    }

    async fn get_commit_time(
        &self,
        organization: &str,
        name: &str,
        sha: &str,
    ) -> platform::Result<Option<DateTime<Utc>>> {
        let route = format!("/repos/{organization}/{name}/commits/{sha}");
        let Some(commit) = self.get_json::<GitHubCommit>(&route, &[]).await? else {
            return Ok(None);
        };
        match to_platform_commit(commit) {
            Ok(commit) => Ok(Some(commit.committed_at)),
            Err(GitHubError::Decode(msg)) => {
                tracing::debug!(route, "Head commit without usable date: {}", msg);
                Ok(None)
            }
            Err(e) => Err(PlatformError::from(e)),
        }
    }

    async fn list_commits(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        since: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> platform::Result<Vec<PlatformCommit>> {
        let route = format!("/repos/{organization}/{name}/commits");
        let mut query = vec![("sha", branch.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        let items: Vec<GitHubCommit> = self.get_page(&route, query, page).await?;
        Ok(convert_page(items, to_platform_commit)?)
    }

    async fn list_contributors(
        &self,
        organization: &str,
        name: &str,
        page: PageRequest,
    ) -> platform::Result<Vec<PlatformContributor>> {
        let route = format!("/repos/{organization}/{name}/contributors");
        let items: Vec<GitHubContributor> = self.get_page(&route, Vec::new(), page).await?;
        Ok(convert_page(items, to_platform_contributor)?)
    }
}
