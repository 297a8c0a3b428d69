//! Migration to create the job_listings table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobListings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobListings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobListings::CompanyId).uuid().not_null())
                    .col(
                        ColumnDef::new(JobListings::JobTitle)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(JobListings::JobDescription).text().not_null())
                    .col(
                        ColumnDef::new(JobListings::JobLocation)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JobListings::Salary)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(JobListings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JobListings::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_listings_company_id")
                            .from(JobListings::Table, JobListings::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Employer listings filter by company
        manager
            .create_index(
                Index::create()
                    .name("idx_job_listings_company_id")
                    .table(JobListings::Table)
                    .col(JobListings::CompanyId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_job_listings_company_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(JobListings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobListings {
    Table,
    Id,
    CompanyId,
    JobTitle,
    JobDescription,
    JobLocation,
    Salary,
    CreatedAt,
    IsActive,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
}
