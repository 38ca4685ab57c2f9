//! Conversion from GitHub wire types to platform types.

use octocrab::models::Repository as GitHubRepo;

use super::error::GitHubError;
use super::types::{GitHubBranch, GitHubCommit, GitHubContributor};
use crate::platform::{
    AccountType, PlatformAuthor, PlatformBranch, PlatformCommit, PlatformContributor,
    PlatformRepo,
};

/// Convert a GitHub repository to a platform-agnostic PlatformRepo.
pub fn to_platform_repo(repo: &GitHubRepo) -> PlatformRepo {
    let organization = repo
        .owner
        .as_ref()
        .map(|o| o.login.clone())
        .unwrap_or_default();
    let owner_type = repo.owner.as_ref().map(|o| o.r#type.clone());

    PlatformRepo {
        organization,
        name: repo.name.clone(),
        default_branch: repo
            .default_branch
            .clone()
            .unwrap_or_else(|| "main".to_string()),
        is_fork: repo.fork.unwrap_or(false),
        stars: repo.stargazers_count.and_then(|n| i32::try_from(n).ok()),
        forks: repo.forks_count.and_then(|n| i32::try_from(n).ok()),
        owner_type,
        created_at: repo.created_at,
        updated_at: repo.updated_at,
        pushed_at: repo.pushed_at,
    }
}

/// Convert a branch entry. Fails when the name or head sha is missing.
pub fn to_platform_branch(branch: GitHubBranch) -> Result<PlatformBranch, GitHubError> {
    let name = branch
        .name
        .ok_or_else(|| GitHubError::Decode("branch without name".to_string()))?;
    let head_sha = branch
        .commit
        .and_then(|c| c.sha)
        .ok_or_else(|| GitHubError::Decode(format!("branch {name} without head commit")))?;
    Ok(PlatformBranch { name, head_sha })
}

/// Convert a commit entry.
///
/// The committer date wins over the author date. A commit with neither, or
/// without a sha, fails conversion.
pub fn to_platform_commit(commit: GitHubCommit) -> Result<PlatformCommit, GitHubError> {
    let hash = commit
        .sha
        .ok_or_else(|| GitHubError::Decode("commit without sha".to_string()))?;
    let detail = commit
        .commit
        .ok_or_else(|| GitHubError::Decode(format!("commit {hash} without detail")))?;

    let committed_at = detail
        .committer
        .as_ref()
        .and_then(|c| c.date)
        .or_else(|| detail.author.as_ref().and_then(|a| a.date))
        .ok_or_else(|| GitHubError::Decode(format!("commit {hash} without date")))?;

    let author_name = detail
        .author
        .and_then(|a| a.name)
        .unwrap_or_default();

    let author = commit.author.and_then(|account| {
        Some(PlatformAuthor {
            id: account.id?,
            login: account.login?,
            avatar_url: account.avatar_url,
        })
    });

    Ok(PlatformCommit {
        hash,
        author,
        author_name,
        committed_at,
    })
}

/// Convert a contributor entry. Fails when the id or login is missing.
pub fn to_platform_contributor(
    contributor: GitHubContributor,
) -> Result<PlatformContributor, GitHubError> {
    let (Some(id), Some(login)) = (contributor.id, contributor.login) else {
        return Err(GitHubError::Decode(
            "contributor without id or login".to_string(),
        ));
    };

    let contributions = contributor
        .contributions
        .map(|n| i32::try_from(n).unwrap_or(i32::MAX))
        .unwrap_or(0);

    Ok(PlatformContributor {
        id,
        login,
        avatar_url: contributor.avatar_url,
        account_type: contributor
            .account_type
            .as_deref()
            .map(AccountType::parse)
            .unwrap_or(AccountType::Other),
        contributions,
    })
}

/// Convert a whole page; one unconvertible item fails the page.
pub fn convert_page<T, U>(
    items: Vec<T>,
    convert: impl Fn(T) -> Result<U, GitHubError>,
) -> Result<Vec<U>, GitHubError> {
    items.into_iter().map(convert).collect()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::github::types::{
        GitHubAccount, GitHubCommitDetail, GitHubCommitRef, GitHubSignature,
    };

    fn signature(name: &str, ts: Option<i64>) -> GitHubSignature {
        GitHubSignature {
            name: Some(name.to_string()),
            date: ts.map(|s| Utc.timestamp_opt(s, 0).unwrap()),
        }
    }

    #[test]
    fn commit_prefers_committer_date() {
        let commit = GitHubCommit {
            sha: Some("a1".to_string()),
            author: Some(GitHubAccount {
                id: Some(42),
                login: Some("alice".to_string()),
                avatar_url: None,
                account_type: Some("User".to_string()),
            }),
            commit: Some(GitHubCommitDetail {
                author: Some(signature("Alice", Some(1_000))),
                committer: Some(signature("Bob", Some(2_000))),
            }),
        };

        let converted = to_platform_commit(commit).unwrap();
        assert_eq!(converted.hash, "a1");
        assert_eq!(converted.author_name, "Alice");
        assert_eq!(converted.committed_at.timestamp(), 2_000);
        assert_eq!(converted.author.unwrap().login, "alice");
    }

    #[test]
    fn commit_falls_back_to_author_date() {
        let commit = GitHubCommit {
            sha: Some("a2".to_string()),
            author: None,
            commit: Some(GitHubCommitDetail {
                author: Some(signature("Alice", Some(1_000))),
                committer: Some(signature("Bob", None)),
            }),
        };

        let converted = to_platform_commit(commit).unwrap();
        assert_eq!(converted.committed_at.timestamp(), 1_000);
        assert!(converted.author.is_none());
    }

    #[test]
    fn commit_without_any_date_is_rejected() {
        let commit = GitHubCommit {
            sha: Some("a3".to_string()),
            author: None,
            commit: Some(GitHubCommitDetail {
                author: None,
                committer: None,
            }),
        };
        assert!(matches!(
            to_platform_commit(commit),
            Err(GitHubError::Decode(_))
        ));
    }

    #[test]
    fn unlinked_account_becomes_none() {
        let commit = GitHubCommit {
            sha: Some("a4".to_string()),
            author: Some(GitHubAccount {
                id: None,
                login: None,
                avatar_url: None,
                account_type: None,
            }),
            commit: Some(GitHubCommitDetail {
                author: Some(signature("Ghost", Some(5))),
                committer: None,
            }),
        };
        assert!(to_platform_commit(commit).unwrap().author.is_none());
    }

    #[test]
    fn branch_requires_head_sha() {
        let ok = to_platform_branch(GitHubBranch {
            name: Some("dev".to_string()),
            commit: Some(GitHubCommitRef {
                sha: Some("ff".to_string()),
            }),
        })
        .unwrap();
        assert_eq!(ok.head_sha, "ff");

        let missing = to_platform_branch(GitHubBranch {
            name: Some("dev".to_string()),
            commit: None,
        });
        assert!(missing.is_err());
    }

    #[test]
    fn contributor_account_type_is_parsed() {
        let converted = to_platform_contributor(GitHubContributor {
            id: Some(9),
            login: Some("renovate[bot]".to_string()),
            avatar_url: None,
            account_type: Some("Bot".to_string()),
            contributions: Some(3),
        })
        .unwrap();
        assert_eq!(converted.account_type, AccountType::Bot);
        assert_eq!(converted.contributions, 3);
    }

    #[test]
    fn one_bad_item_fails_the_page() {
        let items = vec![
            GitHubContributor {
                id: Some(1),
                login: Some("alice".to_string()),
                avatar_url: None,
                account_type: Some("User".to_string()),
                contributions: Some(42),
            },
            GitHubContributor {
                id: None,
                login: None,
                avatar_url: None,
                account_type: Some("Anonymous".to_string()),
                contributions: Some(1),
            },
        ];
        assert!(convert_page(items, to_platform_contributor).is_err());
    }
}
