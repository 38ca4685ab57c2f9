//! Repository entity - one row per tracked (organization, name) pair.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::repo_type::RepoType;

/// Repository model.
///
/// Rows are created when a repository is first tracked and are never deleted,
/// even if the repository disappears upstream.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    // ─── Identity ────────────────────────────────────────────────────────────
    /// Owning organization (or user) login.
    #[sea_orm(primary_key, auto_increment = false)]
    pub organization: String,
    /// Repository name (URL-safe slug).
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,

    // ─── Classification ──────────────────────────────────────────────────────
    pub repo_type: RepoType,
    /// Parent project identifiers this repository depends on (JSON array).
    #[sea_orm(column_type = "Json")]
    pub dependencies: serde_json::Value,

    // ─── Upstream Metadata ───────────────────────────────────────────────────
    #[sea_orm(default_value = "main")]
    pub default_branch: String,
    pub stars: Option<i32>,
    pub forks: Option<i32>,
    /// Upstream owner account type ("Organization" or "User").
    pub owner_type: Option<String>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_at: Option<DateTimeWithTimeZone>,
    /// Last upstream update. Change-detection signal.
    pub updated_at: Option<DateTimeWithTimeZone>,
    /// Last upstream push. Change-detection signal.
    pub pushed_at: Option<DateTimeWithTimeZone>,
    /// When the metadata snapshot was last persisted. `None` until the first
    /// successful sync.
    pub synced_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Compute the full name (organization/name).
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.organization, self.name)
    }

    /// Dependencies as a list of strings, ignoring non-string entries.
    pub fn dependency_list(&self) -> Vec<String> {
        self.dependencies
            .as_array()
            .map(|deps| {
                deps.iter()
                    .filter_map(|d| d.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}
