//! Derived aggregate: commits per week, with a running total.
//!
//! Rows are rebuilt wholesale by [`crate::views`]; nothing else writes here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weekly_commit_totals")]
pub struct Model {
    /// Monday of the week, formatted `YYYY-MM-DD`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub week_start: String,
    pub commits: i64,
    pub cumulative_commits: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
