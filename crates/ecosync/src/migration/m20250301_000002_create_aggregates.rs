//! Summary tables rebuilt by the view refresher.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WeeklyCommitTotals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeeklyCommitTotals::WeekStart)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WeeklyCommitTotals::Commits)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WeeklyCommitTotals::CumulativeCommits)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WeeklyDeveloperTotals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WeeklyDeveloperTotals::WeekStart)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WeeklyDeveloperTotals::NewDevelopers)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WeeklyDeveloperTotals::CumulativeDevelopers)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WeeklyDeveloperTotals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WeeklyCommitTotals::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum WeeklyCommitTotals {
    Table,
    WeekStart,
    Commits,
    CumulativeCommits,
}

#[derive(DeriveIden)]
enum WeeklyDeveloperTotals {
    Table,
    WeekStart,
    NewDevelopers,
    CumulativeDevelopers,
}
