use std::collections::HashMap;

use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entity::commit::{ActiveModel, Column, Entity as Commit};
use crate::entity::developer::{
    ActiveModel as DeveloperActiveModel, Column as DeveloperColumn, Entity as Developer,
};
use crate::platform::{PlatformAuthor, PlatformCommit};

use super::errors::{Result, StoreError};
use super::retry::retry_write;

/// Rows per INSERT statement, well under SQLite's bind parameter limit.
const INSERT_CHUNK: usize = 500;

/// Insert commits observed on `branch`, ignoring hashes already stored.
///
/// Linked authors are upserted into `developers` first. Returns the number of
/// commit rows actually inserted, so replaying the same page returns 0.
pub async fn insert_commits(
    db: &DatabaseConnection,
    organization: &str,
    repo: &str,
    branch: &str,
    commits: &[PlatformCommit],
) -> Result<u64> {
    if commits.is_empty() {
        return Ok(0);
    }

    upsert_developers(db, commits.iter().filter_map(|c| c.author.as_ref())).await?;

    let models: Vec<ActiveModel> = commits
        .iter()
        .map(|c| ActiveModel {
            organization: Set(organization.to_string()),
            repo: Set(repo.to_string()),
            hash: Set(c.hash.clone()),
            author_id: Set(c.author.as_ref().map(|a| a.id)),
            author_name: Set(c.author_name.clone()),
            branch: Set(branch.to_string()),
            commit_date: Set(c.committed_at.fixed_offset()),
        })
        .collect();

    let on_conflict = OnConflict::columns([Column::Organization, Column::Repo, Column::Hash])
        .do_nothing()
        .to_owned();

    let mut inserted = 0u64;
    for chunk in models.chunks(INSERT_CHUNK) {
        inserted += retry_write(
            || async {
                Commit::insert_many(chunk.to_vec())
                    .on_conflict(on_conflict.clone())
                    .exec_without_returning(db)
                    .await
                    .map_err(StoreError::from)
            },
            "insert commits",
        )
        .await?;
    }

    tracing::debug!(
        organization,
        repo,
        branch,
        received = commits.len(),
        inserted,
        "Stored commit page"
    );
    Ok(inserted)
}

/// Upsert developer accounts; display fields are last-write-wins.
///
/// Duplicate ids within the input collapse to the last occurrence.
pub async fn upsert_developers<'a>(
    db: &DatabaseConnection,
    authors: impl IntoIterator<Item = &'a PlatformAuthor>,
) -> Result<u64> {
    let mut latest: HashMap<i64, &PlatformAuthor> = HashMap::new();
    let mut order = Vec::new();
    for author in authors {
        if latest.insert(author.id, author).is_none() {
            order.push(author.id);
        }
    }
    if order.is_empty() {
        return Ok(0);
    }

    let models: Vec<DeveloperActiveModel> = order
        .iter()
        .filter_map(|id| latest.get(id))
        .map(|a| DeveloperActiveModel {
            id: Set(a.id),
            login: Set(a.login.clone()),
            avatar_url: Set(a.avatar_url.clone()),
        })
        .collect();

    let on_conflict = OnConflict::column(DeveloperColumn::Id)
        .update_columns([DeveloperColumn::Login, DeveloperColumn::AvatarUrl])
        .to_owned();

    let mut written = 0u64;
    for chunk in models.chunks(INSERT_CHUNK) {
        written += retry_write(
            || async {
                Developer::insert_many(chunk.to_vec())
                    .on_conflict(on_conflict.clone())
                    .exec_without_returning(db)
                    .await
                    .map_err(StoreError::from)
            },
            "upsert developers",
        )
        .await?;
    }
    Ok(written)
}
