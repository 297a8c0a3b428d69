//! # Application Tracker Repository
//!
//! Applications link one candidate to one job. The `(job_id, candidate_id)`
//! unique index is the final word on duplicates; the pre-insert existence
//! check only gives a friendlier answer in the common case.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::job_application::{
    ActiveModel as ApplicationActiveModel, Column, Model as ApplicationModel,
};
use crate::models::{ApplicationStatus, JobApplication, User, user};
use crate::ownership::application_condition;
use crate::policy::{ALREADY_APPLIED, Scope};

/// Validated data for a new application
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
}

/// Candidate-editable fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ApplicationChanges {
    pub resume: Option<String>,
    /// `Some(None)` clears the cover letter
    pub cover_letter: Option<Option<String>>,
}

/// Repository for job applications
pub struct ApplicationRepository<'a, C> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ApplicationRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn exists_for(&self, job_id: Uuid, candidate_id: Uuid) -> Result<bool, RepositoryError> {
        let found = JobApplication::find()
            .filter(Column::JobId.eq(job_id))
            .filter(Column::CandidateId.eq(candidate_id))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(found.is_some())
    }

    /// Insert a pending application. A racing duplicate is reported as a
    /// validation failure, same as the pre-insert check.
    pub async fn create(
        &self,
        application: NewApplication,
    ) -> Result<ApplicationModel, RepositoryError> {
        let model = ApplicationActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(application.job_id),
            candidate_id: Set(application.candidate_id),
            resume: Set(application.resume),
            cover_letter: Set(application.cover_letter),
            applied_at: Set(Utc::now().into()),
            status: Set(ApplicationStatus::Pending),
        };

        model.insert(self.db).await.map_err(|err| {
            let err = RepositoryError::database_error(err);
            if err.is_unique_violation() {
                RepositoryError::validation_error(ALREADY_APPLIED)
            } else {
                err
            }
        })
    }

    /// Applications visible under `scope`, newest first.
    pub async fn list(
        &self,
        scope: &Scope,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationModel>, RepositoryError> {
        let mut query = JobApplication::find().filter(application_condition(scope));
        if let Some(status) = status {
            query = query.filter(Column::Status.eq(status));
        }

        query
            .order_by_desc(Column::AppliedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// All applications for a job, each with its candidate account.
    pub async fn list_for_job(
        &self,
        job_id: Uuid,
    ) -> Result<Vec<(ApplicationModel, user::Model)>, RepositoryError> {
        let rows = JobApplication::find()
            .filter(Column::JobId.eq(job_id))
            .find_also_related(User)
            .order_by_desc(Column::AppliedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        Ok(rows
            .into_iter()
            .filter_map(|(application, candidate)| candidate.map(|c| (application, c)))
            .collect())
    }

    pub async fn update(
        &self,
        application: ApplicationModel,
        changes: ApplicationChanges,
    ) -> Result<ApplicationModel, RepositoryError> {
        if changes.resume.is_none() && changes.cover_letter.is_none() {
            return Ok(application);
        }

        let mut active = application.into_active_model();
        if let Some(resume) = changes.resume {
            active.resume = Set(resume);
        }
        if let Some(cover_letter) = changes.cover_letter {
            active.cover_letter = Set(cover_letter);
        }

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Set the status. Any value may follow any other.
    pub async fn set_status(
        &self,
        application: ApplicationModel,
        status: ApplicationStatus,
    ) -> Result<ApplicationModel, RepositoryError> {
        let mut active = application.into_active_model();
        active.status = Set(status);

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn delete(&self, application: ApplicationModel) -> Result<(), RepositoryError> {
        application
            .delete(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }
}
