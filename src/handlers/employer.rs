//! # Employer Application Actions
//!
//! Status changes use the ownership-folded lookup (a foreign application is
//! not-found). Applicant listing looks the job up first and compares owners,
//! so a foreign job is forbidden.

use axum::{
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::applications::parse_status;
use super::path_id;
use crate::auth::AuthUser;
use crate::error::{ApiError, not_found, validation_error};
use crate::models::{ApplicationStatus, job_application, user};
use crate::notifications::Notification;
use crate::ownership::{APPLICATION_NOT_FOUND, lookup_job, resolve_application, resolve_job};
use crate::policy::{Action, JOB_NOT_FOUND};
use crate::repositories::{ApplicationRepository, UserRepository};
use crate::server::AppState;

/// Status change payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeStatusRequest {
    /// `pending`, `accepted` or `rejected`
    #[schema(example = "accepted")]
    pub status: Option<String>,
}

/// Status change acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChangeStatusResponse {
    #[schema(example = "Status Updated Successfully")]
    pub message: String,
    pub status: ApplicationStatus,
}

/// Public view of an applicant account
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

/// An application as seen by the job owner
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicantResponse {
    pub id: Uuid,
    pub candidate: CandidateSummary,
    pub resume: String,
    pub cover_letter: Option<String>,
    pub applied_at: DateTime<FixedOffset>,
    pub status: ApplicationStatus,
}

impl From<(job_application::Model, user::Model)> for ApplicantResponse {
    fn from((application, candidate): (job_application::Model, user::Model)) -> Self {
        Self {
            id: application.id,
            candidate: CandidateSummary {
                id: candidate.id,
                username: candidate.username,
                email: candidate.email,
            },
            resume: application.resume,
            cover_letter: application.cover_letter,
            applied_at: application.applied_at,
            status: application.status,
        }
    }
}

/// Set the status of an application to one of the caller's jobs
#[utoipa::path(
    patch,
    path = "/api/v1/employer/applications/{id}/status",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ChangeStatusResponse),
        (status = 400, description = "Status is not one of pending, accepted, rejected", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer", body = ApiError),
        (status = 404, description = "No such application to the caller's jobs", body = ApiError)
    ),
    tag = "employer"
)]
pub async fn change_status(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<ChangeStatusResponse>, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::ChangeApplicationStatus)?;
    let application_id = path_id(path, APPLICATION_NOT_FOUND)?;
    let application = resolve_application(&state.db, &scope, application_id).await?;

    let Json(request) = payload?;
    let status = parse_status(request.status.as_deref())?.ok_or_else(|| {
        validation_error(
            "Invalid entry",
            serde_json::json!({ "status": super::REQUIRED }),
        )
    })?;

    let previous = application.status;
    let (job, company) = resolve_job(&state.db, &scope, application.job_id).await?;
    let candidate = UserRepository::new(&state.db)
        .find_by_id(application.candidate_id)
        .await?;

    let application = ApplicationRepository::new(&state.db)
        .set_status(application, status)
        .await?;

    metrics::counter!("application_status_changes_total", "status" => status.as_str())
        .increment(1);
    tracing::info!(
        application_id = %application.id,
        from = %previous,
        to = %status,
        "Application status changed"
    );

    if let Some(candidate) = candidate {
        state.notifier.dispatch(Notification::status_changed(
            &candidate.email,
            &caller.user.email,
            &job.job_title,
            &company.company_name,
            status.as_str(),
        ));
    }

    Ok(Json(ChangeStatusResponse {
        message: "Status Updated Successfully".to_string(),
        status: application.status,
    }))
}

/// Applications received by one of the caller's jobs
#[utoipa::path(
    get,
    path = "/api/v1/employer/jobs/{id}/applicants",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Applicants", body = Vec<ApplicantResponse>),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer or does not own the job", body = ApiError),
        (status = 404, description = "No such job", body = ApiError)
    ),
    tag = "employer"
)]
pub async fn list_applicants(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<ApplicantResponse>>, ApiError> {
    let job_id = path.ok().map(|Path(id)| id);
    let job_owner_id = match job_id {
        Some(job_id) if caller.identity.is_employer() => lookup_job(&state.db, job_id)
            .await?
            .map(|(_, company)| company.owner_id),
        _ => None,
    };

    state
        .policy
        .authorize(Some(&caller.identity), &Action::ListApplicants { job_owner_id })?;
    let job_id = job_id.ok_or_else(|| not_found(JOB_NOT_FOUND))?;

    let applicants = ApplicationRepository::new(&state.db)
        .list_for_job(job_id)
        .await?;

    Ok(Json(
        applicants.into_iter().map(ApplicantResponse::from).collect(),
    ))
}
