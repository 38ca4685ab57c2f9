use std::collections::HashMap;

use sea_orm::{DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

use crate::entity::contribution::{ActiveModel, Column, Entity as Contribution};
use crate::platform::{PlatformAuthor, PlatformContributor};

use super::commits::upsert_developers;
use super::errors::{Result, StoreError};
use super::retry::retry_write;

/// Store contribution totals for one repository.
///
/// Each total replaces the stored value, including when it went down.
/// Developers are upserted first. Returns the number of contribution rows
/// written.
pub async fn upsert_contributions(
    db: &DatabaseConnection,
    organization: &str,
    repo: &str,
    contributors: &[PlatformContributor],
) -> Result<u64> {
    if contributors.is_empty() {
        return Ok(0);
    }

    let authors: Vec<PlatformAuthor> = contributors
        .iter()
        .map(|c| PlatformAuthor {
            id: c.id,
            login: c.login.clone(),
            avatar_url: c.avatar_url.clone(),
        })
        .collect();
    upsert_developers(db, authors.iter()).await?;

    // One row per developer; the last entry wins if the upstream list repeats one.
    let mut totals: HashMap<i64, i32> = HashMap::new();
    let mut order = Vec::new();
    for contributor in contributors {
        if totals.insert(contributor.id, contributor.contributions).is_none() {
            order.push(contributor.id);
        }
    }

    let models: Vec<ActiveModel> = order
        .iter()
        .map(|id| ActiveModel {
            developer_id: Set(*id),
            organization: Set(organization.to_string()),
            repo: Set(repo.to_string()),
            contributions: Set(totals.get(id).copied().unwrap_or_default()),
        })
        .collect();

    let on_conflict = OnConflict::columns([
        Column::DeveloperId,
        Column::Organization,
        Column::Repo,
    ])
    .update_column(Column::Contributions)
    .to_owned();

    let written = retry_write(
        || async {
            Contribution::insert_many(models.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
                .map_err(StoreError::from)
        },
        "upsert contributions",
    )
    .await?;

    tracing::debug!(organization, repo, written, "Stored contribution totals");
    Ok(written)
}
