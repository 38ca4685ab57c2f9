//! GitHub REST wire types.
//!
//! Every field is optional so a single odd item does not fail decoding of a
//! whole page; required fields are enforced during conversion instead.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// An entry of `GET /repos/{owner}/{repo}/branches`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubBranch {
    pub name: Option<String>,
    pub commit: Option<GitHubCommitRef>,
}

/// Commit pointer embedded in a branch entry.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitRef {
    pub sha: Option<String>,
}

/// An entry of `GET /repos/{owner}/{repo}/commits` (also the single commit body).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub sha: Option<String>,
    /// Linked account; `null` or `{}` when the author email maps to no account.
    pub author: Option<GitHubAccount>,
    pub commit: Option<GitHubCommitDetail>,
}

/// A platform account as embedded in commit and contributor payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubAccount {
    pub id: Option<i64>,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

/// The git-level part of a commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    pub author: Option<GitHubSignature>,
    pub committer: Option<GitHubSignature>,
}

/// Name and timestamp of a commit author or committer.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubSignature {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// An entry of `GET /repos/{owner}/{repo}/contributors`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContributor {
    pub id: Option<i64>,
    pub login: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "type")]
    pub account_type: Option<String>,
    pub contributions: Option<i64>,
}
