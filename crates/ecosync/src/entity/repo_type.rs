//! Classification of why a repository is tracked.

use std::str::FromStr;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a repository belongs to the tracked ecosystem.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "kebab-case")]
pub enum RepoType {
    /// Owned by a whitelisted organization.
    #[sea_orm(string_value = "whitelisted")]
    #[default]
    Whitelisted,
    /// Detected through a dependency on an ecosystem project.
    #[sea_orm(string_value = "dependent")]
    Dependent,
    /// Fork of an ecosystem repository.
    #[sea_orm(string_value = "fork")]
    Fork,
    /// Fork that is itself whitelisted. Listed, never measured.
    #[sea_orm(string_value = "whitelisted-fork")]
    WhitelistedFork,
}

impl RepoType {
    /// Whether activity metrics (branches, commits, contributions) are collected.
    #[inline]
    pub fn collects_activity(self) -> bool {
        !matches!(self, RepoType::WhitelistedFork)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RepoType::Whitelisted => "whitelisted",
            RepoType::Dependent => "dependent",
            RepoType::Fork => "fork",
            RepoType::WhitelistedFork => "whitelisted-fork",
        }
    }
}

impl std::fmt::Display for RepoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "whitelisted" => Ok(RepoType::Whitelisted),
            "dependent" => Ok(RepoType::Dependent),
            "fork" => Ok(RepoType::Fork),
            "whitelisted-fork" | "whitelisted_fork" => Ok(RepoType::WhitelistedFork),
            other => Err(format!("unknown repo type: {other}")),
        }
    }
}
