//! # Application Handlers (candidate side)
//!
//! Applicants create, read, edit and withdraw their own applications. Every
//! lookup carries the applicant predicate, so someone else's application
//! reads as not-found.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{FieldErrors, path_id};
use crate::auth::AuthUser;
use crate::error::{ApiError, validation_error};
use crate::models::{ApplicationStatus, job_application};
use crate::notifications::Notification;
use crate::ownership::{APPLICATION_NOT_FOUND, lookup_job, resolve_application};
use crate::policy::{Action, Denial, JOB_NOT_FOUND};
use crate::repositories::application::{ApplicationChanges, NewApplication};
use crate::repositories::{ApplicationRepository, UserRepository};
use crate::server::AppState;

pub const JOB_ID_REQUIRED: &str = "Job ID is required.";

/// Application payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateApplicationRequest {
    /// Id of the job being applied to
    pub job: Option<Uuid>,
    /// Reference to the uploaded resume
    #[schema(example = "resumes/jane-doe.pdf")]
    pub resume: Option<String>,
    pub cover_letter: Option<String>,
}

/// Candidate-editable fields; status and timestamps are read-only
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateApplicationRequest {
    pub resume: Option<String>,
    /// An empty string clears the cover letter
    pub cover_letter: Option<String>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListApplicationsQuery {
    /// `pending`, `accepted` or `rejected`
    pub status: Option<String>,
}

/// Application representation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job: Uuid,
    pub candidate: Uuid,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub applied_at: DateTime<FixedOffset>,
    pub status: ApplicationStatus,
}

impl From<job_application::Model> for ApplicationResponse {
    fn from(model: job_application::Model) -> Self {
        Self {
            id: model.id,
            job: model.job_id,
            candidate: model.candidate_id,
            resume: model.resume,
            cover_letter: model.cover_letter,
            applied_at: model.applied_at,
            status: model.status,
        }
    }
}

pub(crate) fn parse_status(raw: Option<&str>) -> Result<Option<ApplicationStatus>, ApiError> {
    raw.map(|value| {
        value.parse::<ApplicationStatus>().map_err(|message| {
            validation_error("Invalid entry", serde_json::json!({ "status": message }))
        })
    })
    .transpose()
}

/// Apply to a job
#[utoipa::path(
    post,
    path = "/api/v1/applications",
    security(("bearer_auth" = [])),
    request_body = CreateApplicationRequest,
    responses(
        (status = 201, description = "Application submitted", body = ApplicationResponse),
        (status = 400, description = "Missing job id, duplicate application or invalid fields", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller may not apply", body = ApiError),
        (status = 404, description = "No such job", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn create_application(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CreateApplicationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    state
        .policy
        .authorize(Some(&caller.identity), &Action::ManageOwnApplications)?;

    let Json(request) = payload?;
    let job_id = request.job.ok_or_else(|| {
        validation_error(JOB_ID_REQUIRED, serde_json::json!({ "job": JOB_ID_REQUIRED }))
    })?;

    let txn = state.db.begin().await?;
    let job = lookup_job(&txn, job_id).await?;
    let already_applied = match job {
        Some(_) => {
            ApplicationRepository::new(&txn)
                .exists_for(job_id, caller.identity.user_id)
                .await?
        }
        None => false,
    };

    state.policy.authorize(
        Some(&caller.identity),
        &Action::Apply {
            job_exists: job.is_some(),
            already_applied,
        },
    )?;
    let Some((job, company)) = job else {
        return Err(Denial::NotFound(JOB_NOT_FOUND).into());
    };

    let mut errors = FieldErrors::default();
    let resume = errors.required("resume", request.resume);
    errors.into_result()?;
    let cover_letter = request
        .cover_letter
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let application = ApplicationRepository::new(&txn)
        .create(NewApplication {
            job_id,
            candidate_id: caller.identity.user_id,
            resume,
            cover_letter,
        })
        .await?;
    let employer = UserRepository::new(&txn)
        .find_by_id(company.owner_id)
        .await?;
    txn.commit().await?;

    metrics::counter!("applications_submitted_total").increment(1);
    tracing::info!(
        application_id = %application.id,
        %job_id,
        candidate_id = %caller.identity.user_id,
        "Application submitted"
    );

    if let Some(employer) = employer {
        state.notifier.dispatch(Notification::application_submitted(
            &caller.user.username,
            &caller.user.email,
            &employer.email,
            &job.job_title,
        ));
    }

    Ok((StatusCode::CREATED, Json(application.into())))
}

/// The caller's applications
#[utoipa::path(
    get,
    path = "/api/v1/applications",
    security(("bearer_auth" = [])),
    params(ListApplicationsQuery),
    responses(
        (status = 200, description = "Caller's applications", body = Vec<ApplicationResponse>),
        (status = 400, description = "Unknown status filter", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller may not apply", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn list_applications(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ListApplicationsQuery>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::ManageOwnApplications)?;
    let status = parse_status(query.status.as_deref())?;

    let applications = ApplicationRepository::new(&state.db)
        .list(&scope, status)
        .await?;

    Ok(Json(
        applications
            .into_iter()
            .map(ApplicationResponse::from)
            .collect(),
    ))
}

/// One of the caller's applications
#[utoipa::path(
    get,
    path = "/api/v1/applications/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 200, description = "Application", body = ApplicationResponse),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller may not apply", body = ApiError),
        (status = 404, description = "No such application of the caller", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn get_application(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::ManageOwnApplications)?;
    let application_id = path_id(path, APPLICATION_NOT_FOUND)?;
    let application = resolve_application(&state.db, &scope, application_id).await?;

    Ok(Json(application.into()))
}

/// Edit resume or cover letter of one of the caller's applications
#[utoipa::path(
    patch,
    path = "/api/v1/applications/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = UpdateApplicationRequest,
    responses(
        (status = 200, description = "Application updated", body = ApplicationResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller may not apply", body = ApiError),
        (status = 404, description = "No such application of the caller", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn update_application(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateApplicationRequest>, JsonRejection>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::ManageOwnApplications)?;
    let application_id = path_id(path, APPLICATION_NOT_FOUND)?;
    let application = resolve_application(&state.db, &scope, application_id).await?;

    let Json(request) = payload?;
    let mut errors = FieldErrors::default();
    let changes = ApplicationChanges {
        resume: request
            .resume
            .map(|resume| errors.required("resume", Some(resume))),
        cover_letter: request.cover_letter.map(|c| {
            let trimmed = c.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
    };
    errors.into_result()?;

    let application = ApplicationRepository::new(&state.db)
        .update(application, changes)
        .await?;
    tracing::info!(application_id = %application.id, "Application updated");

    Ok(Json(application.into()))
}

/// Withdraw one of the caller's applications
#[utoipa::path(
    delete,
    path = "/api/v1/applications/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Application id")),
    responses(
        (status = 204, description = "Application withdrawn"),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller may not apply", body = ApiError),
        (status = 404, description = "No such application of the caller", body = ApiError)
    ),
    tag = "applications"
)]
pub async fn delete_application(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::ManageOwnApplications)?;
    let application_id = path_id(path, APPLICATION_NOT_FOUND)?;
    let application = resolve_application(&state.db, &scope, application_id).await?;

    ApplicationRepository::new(&state.db)
        .delete(application)
        .await?;
    tracing::info!(%application_id, "Application withdrawn");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status(None).unwrap(), None);
        assert_eq!(
            parse_status(Some("rejected")).unwrap(),
            Some(ApplicationStatus::Rejected)
        );

        let err = parse_status(Some("hired")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message.as_ref(), "Invalid entry");
    }
}
