//! Derived aggregate: developers making their first commit per week, with a
//! running total.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "weekly_developer_totals")]
pub struct Model {
    /// Monday of the week, formatted `YYYY-MM-DD`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub week_start: String,
    pub new_developers: i64,
    pub cumulative_developers: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
