//! Common re-exports for convenient entity usage.

pub use super::branch::{
    ActiveModel as BranchActiveModel, Column as BranchColumn, Entity as Branch,
    Model as BranchModel,
};
pub use super::commit::{
    ActiveModel as CommitActiveModel, Column as CommitColumn, Entity as Commit,
    Model as CommitModel,
};
pub use super::contribution::{
    ActiveModel as ContributionActiveModel, Column as ContributionColumn, Entity as Contribution,
    Model as ContributionModel,
};
pub use super::developer::{
    ActiveModel as DeveloperActiveModel, Column as DeveloperColumn, Entity as Developer,
    Model as DeveloperModel,
};
pub use super::repo_type::RepoType;
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::weekly_commit_total::{
    Entity as WeeklyCommitTotal, Model as WeeklyCommitTotalModel,
};
pub use super::weekly_developer_total::{
    Entity as WeeklyDeveloperTotal, Model as WeeklyDeveloperTotalModel,
};
