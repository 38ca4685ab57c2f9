//! Initial migration: base tables written by the sync engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_branches(manager).await?;
        self.create_developers(manager).await?;
        self.create_commits(manager).await?;
        self.create_contributions(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Developers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Branches::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    // Identity
                    .col(
                        ColumnDef::new(Repositories::Organization)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repositories::Name).string().not_null())
                    // Classification
                    .col(
                        ColumnDef::new(Repositories::RepoType)
                            .string()
                            .not_null()
                            .default("whitelisted"),
                    )
                    .col(
                        ColumnDef::new(Repositories::Dependencies)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    // Upstream metadata
                    .col(
                        ColumnDef::new(Repositories::DefaultBranch)
                            .string()
                            .not_null()
                            .default("main"),
                    )
                    .col(ColumnDef::new(Repositories::Stars).integer().null())
                    .col(ColumnDef::new(Repositories::Forks).integer().null())
                    .col(ColumnDef::new(Repositories::OwnerType).string().null())
                    // Timestamps
                    .col(
                        ColumnDef::new(Repositories::CreatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::PushedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repositories::SyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Repositories::Organization)
                            .col(Repositories::Name),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repositories_repo_type")
                    .table(Repositories::Table)
                    .col(Repositories::RepoType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_branches(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Branches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Branches::Organization).string().not_null())
                    .col(ColumnDef::new(Branches::Repo).string().not_null())
                    .col(ColumnDef::new(Branches::Branch).string().not_null())
                    .col(
                        ColumnDef::new(Branches::LatestCommitDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Branches::Organization)
                            .col(Branches::Repo)
                            .col(Branches::Branch),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_developers(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Developers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Developers::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Developers::Login).string().not_null())
                    .col(ColumnDef::new(Developers::AvatarUrl).text().null())
                    .to_owned(),
            )
            .await
    }

    async fn create_commits(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Commits::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Commits::Organization).string().not_null())
                    .col(ColumnDef::new(Commits::Repo).string().not_null())
                    .col(ColumnDef::new(Commits::Hash).string().not_null())
                    .col(ColumnDef::new(Commits::AuthorId).big_integer().null())
                    .col(ColumnDef::new(Commits::AuthorName).string().not_null())
                    .col(ColumnDef::new(Commits::Branch).string().not_null())
                    .col(
                        ColumnDef::new(Commits::CommitDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(Commits::Organization)
                            .col(Commits::Repo)
                            .col(Commits::Hash),
                    )
                    .to_owned(),
            )
            .await?;

        // Weekly aggregates group by date
        manager
            .create_index(
                Index::create()
                    .name("idx_commits_commit_date")
                    .table(Commits::Table)
                    .col(Commits::CommitDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_commits_author_id")
                    .table(Commits::Table)
                    .col(Commits::AuthorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_contributions(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributions::DeveloperId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributions::Organization)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Contributions::Repo).string().not_null())
                    .col(
                        ColumnDef::new(Contributions::Contributions)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(Contributions::DeveloperId)
                            .col(Contributions::Organization)
                            .col(Contributions::Repo),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contributions_repo")
                    .table(Contributions::Table)
                    .col(Contributions::Organization)
                    .col(Contributions::Repo)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Repositories {
    Table,
    Organization,
    Name,
    RepoType,
    Dependencies,
    DefaultBranch,
    Stars,
    Forks,
    OwnerType,
    CreatedAt,
    UpdatedAt,
    PushedAt,
    SyncedAt,
}

#[derive(DeriveIden)]
enum Branches {
    Table,
    Organization,
    Repo,
    Branch,
    LatestCommitDate,
}

#[derive(DeriveIden)]
enum Developers {
    Table,
    Id,
    Login,
    AvatarUrl,
}

#[derive(DeriveIden)]
enum Commits {
    Table,
    Organization,
    Repo,
    Hash,
    AuthorId,
    AuthorName,
    Branch,
    CommitDate,
}

#[derive(DeriveIden)]
enum Contributions {
    Table,
    DeveloperId,
    Organization,
    Repo,
    Contributions,
}
