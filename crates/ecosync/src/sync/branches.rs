//! Branch enumeration with head commit times.

use std::collections::HashSet;

use crate::platform::{PageRequest, PlatformBranch, PlatformClient};

use super::error::SyncError;
use super::paging::{PageGuard, fetch_with_retry};
use super::types::{BranchHead, SyncOptions};

/// List a repository's branches, default branch first.
///
/// The default branch is always included, even when the API does not list
/// it. Pages are requested until an empty one; duplicate names are dropped.
/// A head commit time that cannot be resolved is `None`. A page error aborts
/// the enumeration.
pub async fn list_branches<C: PlatformClient + ?Sized>(
    client: &C,
    organization: &str,
    repo: &str,
    default_branch: &str,
    options: &SyncOptions,
) -> Result<Vec<BranchHead>, SyncError> {
    let listed = list_all(client, organization, repo, options).await?;

    let default_sha = listed
        .iter()
        .find(|b| b.name == default_branch)
        .map(|b| b.head_sha.clone());

    let mut seen = HashSet::new();
    let mut ordered: Vec<(String, Option<String>)> = Vec::with_capacity(listed.len() + 1);
    seen.insert(default_branch.to_string());
    ordered.push((default_branch.to_string(), default_sha));
    for branch in listed {
        if seen.insert(branch.name.clone()) {
            ordered.push((branch.name, Some(branch.head_sha)));
        }
    }

    let mut heads = Vec::with_capacity(ordered.len());
    for (name, sha) in ordered {
        let head_commit_time = match sha {
            Some(sha) => resolve_head_time(client, organization, repo, &name, &sha, options).await,
            None => None,
        };
        heads.push(BranchHead {
            name,
            head_commit_time,
        });
    }

    tracing::debug!(organization, repo, branches = heads.len(), "Enumerated branches");
    Ok(heads)
}

async fn list_all<C: PlatformClient + ?Sized>(
    client: &C,
    organization: &str,
    repo: &str,
    options: &SyncOptions,
) -> Result<Vec<PlatformBranch>, SyncError> {
    let context = format!("{organization}/{repo} branches");
    let mut guard = PageGuard::new(context.clone());
    let mut page = PageRequest::first(options.page_size);
    let mut branches = Vec::new();

    loop {
        let result = fetch_with_retry(
            || client.list_branches(organization, repo, page),
            &options.retry,
            &context,
        )
        .await;

        match guard.observe(result, page)? {
            Some(items) if items.is_empty() => break,
            Some(items) => branches.extend(items),
            None => {}
        }
        page = page.next();
    }

    Ok(branches)
}

async fn resolve_head_time<C: PlatformClient + ?Sized>(
    client: &C,
    organization: &str,
    repo: &str,
    branch: &str,
    sha: &str,
    options: &SyncOptions,
) -> Option<chrono::DateTime<chrono::Utc>> {
    let context = format!("{organization}/{repo}@{sha}");
    match fetch_with_retry(
        || client.get_commit_time(organization, repo, sha),
        &options.retry,
        &context,
    )
    .await
    {
        Ok(time) => time,
        Err(e) => {
            tracing::debug!(
                organization,
                repo,
                branch,
                error_class = %e.class(),
                "Could not resolve head commit time: {}",
                e
            );
            None
        }
    }
}
