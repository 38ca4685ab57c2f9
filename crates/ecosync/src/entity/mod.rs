//! SeaORM entity definitions for the ecosync database schema.

pub mod branch;
pub mod commit;
pub mod contribution;
pub mod developer;
pub mod prelude;
pub mod repo_type;
pub mod repository;
pub mod weekly_commit_total;
pub mod weekly_developer_total;
