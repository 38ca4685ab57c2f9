//! Contributor totals.

use crate::platform::{AccountType, PageRequest, PlatformClient, PlatformContributor};

use super::error::SyncError;
use super::paging::{PageGuard, fetch_with_retry};
use super::types::SyncOptions;

/// Fetch a repository's contributors, keeping only user accounts.
///
/// Bots and organizations are dropped. Counts are absolute totals meant to
/// replace whatever is stored.
pub async fn fetch_contributors<C: PlatformClient + ?Sized>(
    client: &C,
    organization: &str,
    repo: &str,
    options: &SyncOptions,
) -> Result<Vec<PlatformContributor>, SyncError> {
    let context = format!("{organization}/{repo} contributors");
    let mut guard = PageGuard::new(context.clone());
    let mut page = PageRequest::first(options.page_size);
    let mut contributors = Vec::new();
    let mut excluded = 0usize;

    loop {
        let result = fetch_with_retry(
            || client.list_contributors(organization, repo, page),
            &options.retry,
            &context,
        )
        .await;

        match guard.observe(result, page)? {
            Some(items) if items.is_empty() => break,
            Some(items) => {
                for contributor in items {
                    if contributor.account_type == AccountType::User {
                        contributors.push(contributor);
                    } else {
                        excluded += 1;
                    }
                }
            }
            None => {}
        }
        page = page.next();
    }

    tracing::debug!(
        organization,
        repo,
        contributors = contributors.len(),
        excluded,
        "Fetched contributors"
    );
    Ok(contributors)
}
