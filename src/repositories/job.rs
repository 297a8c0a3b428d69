//! # Job Catalog Repository
//!
//! Listing, creation and mutation of job postings. Every read goes through a
//! policy [`Scope`] so visibility rules live in one place.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, QueryTrait, Set,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::job_listing::{ActiveModel as JobActiveModel, Column, Model as JobModel};
use crate::models::{Company, JobListing, company};
use crate::ownership::job_condition;
use crate::policy::Scope;

/// Validated data for a new posting
#[derive(Debug, Clone)]
pub struct NewJob {
    pub job_title: String,
    pub job_description: String,
    pub job_location: String,
    pub salary: Decimal,
    pub is_active: bool,
}

/// Partial update; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct JobChanges {
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub job_location: Option<String>,
    pub salary: Option<Decimal>,
    pub is_active: Option<bool>,
}

impl JobChanges {
    pub fn is_empty(&self) -> bool {
        self.job_title.is_none()
            && self.job_description.is_none()
            && self.job_location.is_none()
            && self.salary.is_none()
            && self.is_active.is_none()
    }
}

/// Listing filters layered on top of the caller's scope
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    /// Case-insensitive match on title, description, location or company name
    pub search: Option<String>,
    pub salary: Option<Decimal>,
    pub job_location: Option<String>,
    pub is_active: Option<bool>,
}

impl JobFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term.to_lowercase());
            let lower = |col: Column| {
                Expr::expr(Func::lower(Expr::col((JobListing, col)))).like(pattern.clone())
            };
            let company_ids = Company::find()
                .select_only()
                .column(company::Column::Id)
                .filter(
                    Expr::expr(Func::lower(Expr::col((Company, company::Column::CompanyName))))
                        .like(pattern.clone()),
                )
                .into_query();

            condition = condition.add(
                Condition::any()
                    .add(lower(Column::JobTitle))
                    .add(lower(Column::JobDescription))
                    .add(lower(Column::JobLocation))
                    .add(Column::CompanyId.in_subquery(company_ids)),
            );
        }
        if let Some(salary) = self.salary {
            condition = condition.add(Column::Salary.eq(salary));
        }
        if let Some(location) = &self.job_location {
            condition = condition.add(Column::JobLocation.eq(location.as_str()));
        }
        if let Some(is_active) = self.is_active {
            condition = condition.add(Column::IsActive.eq(is_active));
        }

        condition
    }
}

/// Repository for job postings
pub struct JobRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> JobRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Create a posting under `company_id`.
    pub async fn create(&self, company_id: Uuid, job: NewJob) -> Result<JobModel, RepositoryError> {
        let model = JobActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            job_title: Set(job.job_title),
            job_description: Set(job.job_description),
            job_location: Set(job.job_location),
            salary: Set(job.salary),
            created_at: Set(Utc::now().into()),
            is_active: Set(job.is_active),
        };

        model
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Postings visible under `scope`, newest first, each with its company.
    pub async fn list(
        &self,
        scope: &Scope,
        filter: &JobFilter,
    ) -> Result<Vec<(JobModel, company::Model)>, RepositoryError> {
        let rows = JobListing::find()
            .filter(job_condition(scope))
            .filter(filter.condition())
            .find_also_related(Company)
            .order_by_desc(Column::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(job, company)| company.map(|company| (job, company)))
            .collect())
    }

    /// Apply a partial update to an already-resolved posting.
    pub async fn update(
        &self,
        job: JobModel,
        changes: JobChanges,
    ) -> Result<JobModel, RepositoryError> {
        if changes.is_empty() {
            return Ok(job);
        }

        let mut active = job.into_active_model();
        if let Some(title) = changes.job_title {
            active.job_title = Set(title);
        }
        if let Some(description) = changes.job_description {
            active.job_description = Set(description);
        }
        if let Some(location) = changes.job_location {
            active.job_location = Set(location);
        }
        if let Some(salary) = changes.salary {
            active.salary = Set(salary);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Delete a posting; its applications go with it.
    pub async fn delete(&self, job: JobModel) -> Result<(), RepositoryError> {
        job.delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}
