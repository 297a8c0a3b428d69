//! Migration to create the job_applications table.
//!
//! The composite unique index on (job_id, candidate_id) guarantees at most one
//! application per candidate and job, even under concurrent submissions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(JobApplications::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(JobApplications::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(JobApplications::JobId).uuid().not_null())
                    .col(
                        ColumnDef::new(JobApplications::CandidateId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(JobApplications::Resume).text().not_null())
                    .col(ColumnDef::new(JobApplications::CoverLetter).text().null())
                    .col(
                        ColumnDef::new(JobApplications::AppliedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(JobApplications::Status)
                            .string_len(10)
                            .not_null()
                            .default("pending"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_applications_job_id")
                            .from(JobApplications::Table, JobApplications::JobId)
                            .to(JobListings::Table, JobListings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_job_applications_candidate_id")
                            .from(JobApplications::Table, JobApplications::CandidateId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_applications_job_candidate")
                    .table(JobApplications::Table)
                    .col(JobApplications::JobId)
                    .col(JobApplications::CandidateId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_applications_candidate_id")
                    .table(JobApplications::Table)
                    .col(JobApplications::CandidateId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_job_applications_candidate_id")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_job_applications_job_candidate")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(JobApplications::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobApplications {
    Table,
    Id,
    JobId,
    CandidateId,
    Resume,
    CoverLetter,
    AppliedAt,
    Status,
}

#[derive(DeriveIden)]
enum JobListings {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
