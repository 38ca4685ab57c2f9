//! Developer entity - one row per upstream account.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "developers")]
pub struct Model {
    /// Stable upstream account id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub login: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
