use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseConnection, EntityTrait, QueryOrder, Set, sea_query::OnConflict,
};
use serde::{Deserialize, Serialize};

use crate::entity::repo_type::RepoType;
use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};
use crate::platform::PlatformRepo;

use super::errors::{Result, StoreError};
use super::retry::retry_write;

/// A repository to add to (or reclassify within) the tracked set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRequest {
    pub organization: String,
    pub name: String,
    #[serde(default)]
    pub repo_type: RepoType,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TrackRequest {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            name: name.into(),
            repo_type: RepoType::default(),
            dependencies: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, repo_type: RepoType) -> Self {
        self.repo_type = repo_type;
        self
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Add a repository to the tracked set.
///
/// Re-tracking an existing repository updates its classification and
/// dependencies; upstream metadata and `synced_at` are left alone.
pub async fn track(db: &DatabaseConnection, request: TrackRequest) -> Result<Model> {
    let organization = request.organization.trim().to_string();
    let name = request.name.trim().to_string();
    if organization.is_empty() || name.is_empty() {
        return Err(StoreError::invalid(
            "organization and name must not be empty",
        ));
    }

    let model = ActiveModel {
        organization: Set(organization.clone()),
        name: Set(name.clone()),
        repo_type: Set(request.repo_type),
        dependencies: Set(serde_json::json!(request.dependencies)),
        default_branch: Set("main".to_string()),
        stars: Set(None),
        forks: Set(None),
        owner_type: Set(None),
        created_at: Set(None),
        updated_at: Set(None),
        pushed_at: Set(None),
        synced_at: Set(None),
    };

    let on_conflict = OnConflict::columns([Column::Organization, Column::Name])
        .update_columns([Column::RepoType, Column::Dependencies])
        .to_owned();

    retry_write(
        || async {
            Repository::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
                .map_err(StoreError::from)
        },
        "track repository",
    )
    .await?;

    tracing::debug!(organization, repo = name, "Tracked repository");

    find(db, &organization, &name)
        .await?
        .ok_or_else(|| StoreError::repository_not_found(&organization, &name))
}

/// Find a tracked repository by key.
pub async fn find(db: &DatabaseConnection, organization: &str, name: &str) -> Result<Option<Model>> {
    Ok(Repository::find_by_id((organization.to_string(), name.to_string()))
        .one(db)
        .await?)
}

/// All tracked repositories, ordered by organization then name.
pub async fn list_tracked(db: &DatabaseConnection) -> Result<Vec<Model>> {
    Ok(Repository::find()
        .order_by_asc(Column::Organization)
        .order_by_asc(Column::Name)
        .all(db)
        .await?)
}

/// Persist a metadata snapshot as one upsert.
///
/// Classification (`repo_type`, `dependencies`) comes from `tracked`, upstream
/// facts from `snapshot`.
pub async fn persist_metadata(
    db: &DatabaseConnection,
    tracked: &Model,
    snapshot: &PlatformRepo,
    synced_at: DateTime<Utc>,
) -> Result<()> {
    let model = metadata_model(tracked, snapshot, synced_at);

    let on_conflict = OnConflict::columns([Column::Organization, Column::Name])
        .update_columns([
            Column::RepoType,
            Column::Dependencies,
            Column::DefaultBranch,
            Column::Stars,
            Column::Forks,
            Column::OwnerType,
            Column::CreatedAt,
            Column::UpdatedAt,
            Column::PushedAt,
            Column::SyncedAt,
        ])
        .to_owned();

    retry_write(
        || async {
            Repository::insert(model.clone())
                .on_conflict(on_conflict.clone())
                .exec_without_returning(db)
                .await
                .map_err(StoreError::from)
        },
        "persist metadata",
    )
    .await?;

    Ok(())
}

fn metadata_model(tracked: &Model, snapshot: &PlatformRepo, synced_at: DateTime<Utc>) -> ActiveModel {
    ActiveModel {
        organization: Set(tracked.organization.clone()),
        name: Set(tracked.name.clone()),
        repo_type: Set(tracked.repo_type),
        dependencies: Set(tracked.dependencies.clone()),
        default_branch: Set(snapshot.default_branch.clone()),
        stars: Set(snapshot.stars),
        forks: Set(snapshot.forks),
        owner_type: Set(snapshot.owner_type.clone()),
        created_at: Set(snapshot.created_at.map(|t| t.fixed_offset())),
        updated_at: Set(snapshot.updated_at.map(|t| t.fixed_offset())),
        pushed_at: Set(snapshot.pushed_at.map(|t| t.fixed_offset())),
        synced_at: Set(Some(synced_at.fixed_offset())),
    }
}
