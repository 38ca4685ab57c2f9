//! Per-branch commit watermarks.
//!
//! A watermark is the newest commit timestamp already ingested for a
//! `(organization, repo, branch)` triple. Watermarks only move forward: a
//! `set` with a timestamp at or before the stored one leaves it unchanged.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, OnConflict};
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::entity::branch::{ActiveModel, Column, Entity as Branch};
use crate::store::{Result, StoreError, retry_write};

/// Progress cursors for branch commit fetching.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// The stored watermark, if any.
    async fn get(&self, organization: &str, repo: &str, branch: &str)
    -> Result<Option<DateTime<Utc>>>;

    /// Advance the watermark to `at`. Never moves it backwards.
    async fn set(&self, organization: &str, repo: &str, branch: &str, at: DateTime<Utc>)
    -> Result<()>;
}

type Key = (String, String, String);

fn key(organization: &str, repo: &str, branch: &str) -> Key {
    (organization.to_string(), repo.to_string(), branch.to_string())
}

/// In-process watermark store.
#[derive(Debug, Default)]
pub struct MemoryWatermarkStore {
    marks: Mutex<HashMap<Key, DateTime<Utc>>>,
}

impl MemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of branches with a watermark.
    pub fn len(&self) -> usize {
        self.marks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn get(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let marks = self.marks.lock().unwrap_or_else(|e| e.into_inner());
        Ok(marks.get(&key(organization, repo, branch)).copied())
    }

    async fn set(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut marks = self.marks.lock().unwrap_or_else(|e| e.into_inner());
        marks
            .entry(key(organization, repo, branch))
            .and_modify(|current| {
                if at > *current {
                    *current = at;
                }
            })
            .or_insert(at);
        Ok(())
    }
}

/// Watermarks stored in the `branches` table.
#[derive(Debug, Clone)]
pub struct DbWatermarkStore {
    db: Arc<DatabaseConnection>,
}

impl DbWatermarkStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

/// Conditional upsert: update only when the incoming timestamp is newer.
pub(crate) fn advance_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Organization, Column::Repo, Column::Branch])
        .update_column(Column::LatestCommitDate)
        .action_and_where(
            Expr::col((Branch, Column::LatestCommitDate))
                .lt(Expr::col((Alias::new("excluded"), Column::LatestCommitDate))),
        )
        .to_owned()
}

#[async_trait]
impl WatermarkStore for DbWatermarkStore {
    async fn get(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let row = Branch::find_by_id((
            organization.to_string(),
            repo.to_string(),
            branch.to_string(),
        ))
        .one(self.db.as_ref())
        .await?;
        Ok(row.map(|b| b.latest_commit_date.with_timezone(&Utc)))
    }

    async fn set(
        &self,
        organization: &str,
        repo: &str,
        branch: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let model = ActiveModel {
            organization: Set(organization.to_string()),
            repo: Set(repo.to_string()),
            branch: Set(branch.to_string()),
            latest_commit_date: Set(at.fixed_offset()),
        };

        retry_write(
            || async {
                Branch::insert(model.clone())
                    .on_conflict(advance_on_conflict())
                    .exec_without_returning(self.db.as_ref())
                    .await
                    .map_err(StoreError::from)
            },
            "advance watermark",
        )
        .await?;

        tracing::debug!(organization, repo, branch, watermark = %at, "Advanced watermark");
        Ok(())
    }
}
