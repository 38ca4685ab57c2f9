//! Derived weekly aggregates.
//!
//! Each view is a summary table rebuilt wholesale from `commits` inside one
//! transaction. Different views may refresh concurrently; a view never
//! refreshes concurrently with itself.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, Statement, TransactionTrait,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Errors that can occur while refreshing aggregates.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Views are not supported on {0:?}")]
    UnsupportedBackend(DatabaseBackend),

    #[error("Refresh task failed: {0}")]
    Task(String),
}

/// A derived aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    /// Commits per ISO week (Monday start) with a running total.
    WeeklyCommitTotals,
    /// Developers first seen per ISO week with a running total.
    WeeklyDeveloperTotals,
}

impl View {
    pub const ALL: [View; 2] = [View::WeeklyCommitTotals, View::WeeklyDeveloperTotals];

    /// Table name, also the name accepted by [`ViewRefresher::refresh`].
    pub fn name(self) -> &'static str {
        match self {
            View::WeeklyCommitTotals => "weekly_commit_totals",
            View::WeeklyDeveloperTotals => "weekly_developer_totals",
        }
    }

    fn index(self) -> usize {
        match self {
            View::WeeklyCommitTotals => 0,
            View::WeeklyDeveloperTotals => 1,
        }
    }

    /// Expression truncating `column` to the Monday of its week, as `YYYY-MM-DD`.
    fn week_start(backend: DatabaseBackend, column: &str) -> Result<String, ViewError> {
        match backend {
            DatabaseBackend::Sqlite => Ok(format!("date({column}, 'weekday 0', '-6 days')")),
            DatabaseBackend::Postgres => Ok(format!(
                "to_char(date_trunc('week', {column} AT TIME ZONE 'UTC'), 'YYYY-MM-DD')"
            )),
            other => Err(ViewError::UnsupportedBackend(other)),
        }
    }

    /// The INSERT ... SELECT that rebuilds this view.
    fn rebuild_sql(self, backend: DatabaseBackend) -> Result<String, ViewError> {
        let sql = match self {
            View::WeeklyCommitTotals => {
                let week = Self::week_start(backend, "commit_date")?;
                format!(
                    "INSERT INTO weekly_commit_totals (week_start, commits, cumulative_commits) \
                     SELECT week_start, commits, \
                     CAST(SUM(commits) OVER (ORDER BY week_start ROWS UNBOUNDED PRECEDING) AS BIGINT) \
                     FROM (SELECT {week} AS week_start, COUNT(*) AS commits \
                     FROM commits GROUP BY 1) AS weekly"
                )
            }
            View::WeeklyDeveloperTotals => {
                let week = Self::week_start(backend, "first_commit")?;
                format!(
                    "INSERT INTO weekly_developer_totals (week_start, new_developers, cumulative_developers) \
                     SELECT week_start, new_developers, \
                     CAST(SUM(new_developers) OVER (ORDER BY week_start ROWS UNBOUNDED PRECEDING) AS BIGINT) \
                     FROM (SELECT {week} AS week_start, COUNT(*) AS new_developers \
                     FROM (SELECT author_id, MIN(commit_date) AS first_commit FROM commits \
                     WHERE author_id IS NOT NULL GROUP BY author_id) AS firsts \
                     GROUP BY 1) AS weekly"
                )
            }
        };
        Ok(sql)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for View {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        View::ALL
            .into_iter()
            .find(|v| v.name() == s.trim())
            .ok_or_else(|| ViewError::UnknownView(s.to_string()))
    }
}

/// Recomputes derived aggregates.
///
/// Clones share the per-view locks.
#[derive(Debug, Clone)]
pub struct ViewRefresher {
    db: Arc<DatabaseConnection>,
    locks: Arc<[Mutex<()>; 2]>,
}

impl ViewRefresher {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            locks: Arc::new([Mutex::new(()), Mutex::new(())]),
        }
    }

    /// Refresh the named views.
    ///
    /// All names are validated before any work starts; one unknown name
    /// rejects the whole request. An empty list refreshes every view.
    pub async fn refresh(&self, names: &[&str]) -> Result<Vec<View>, ViewError> {
        let views = if names.is_empty() {
            View::ALL.to_vec()
        } else {
            let mut views = Vec::with_capacity(names.len());
            for name in names {
                let view: View = name.parse()?;
                if !views.contains(&view) {
                    views.push(view);
                }
            }
            views
        };

        self.refresh_views(&views).await?;
        Ok(views)
    }

    /// Refresh every view.
    pub async fn refresh_all(&self) -> Result<Vec<View>, ViewError> {
        self.refresh(&[]).await
    }

    /// Refresh the given views concurrently.
    pub async fn refresh_views(&self, views: &[View]) -> Result<(), ViewError> {
        let mut tasks = JoinSet::new();
        for &view in views {
            let refresher = self.clone();
            tasks.spawn(async move { refresher.refresh_one(view).await });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| ViewError::Task(e.to_string())).and_then(|r| r);
            if let Err(e) = result
                && first_error.is_none()
            {
                first_error = Some(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rebuild one view. Returns the number of rows written.
    pub async fn refresh_one(&self, view: View) -> Result<u64, ViewError> {
        let _guard = self.locks[view.index()].lock().await;
        let started = Instant::now();

        let backend = self.db.get_database_backend();
        let rebuild = view.rebuild_sql(backend)?;

        let txn = self.db.begin().await?;
        txn.execute(Statement::from_string(
            backend,
            format!("DELETE FROM {}", view.name()),
        ))
        .await?;
        let rows = txn
            .execute(Statement::from_string(backend, rebuild))
            .await?
            .rows_affected();
        txn.commit().await?;

        tracing::debug!(
            view = view.name(),
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refreshed view"
        );
        Ok(rows)
    }
}
