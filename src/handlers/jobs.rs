//! # Job Catalog Handlers
//!
//! Employers manage postings under their own company; candidates browse
//! active postings. Ownership is folded into every lookup, so a posting the
//! caller may not touch reads as not-found.

use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{FieldErrors, path_id};
use super::companies::CompanyResponse;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{company, job_listing};
use crate::ownership::resolve_job;
use crate::policy::{Action, Denial, Identity, JOB_NOT_FOUND, NO_COMPANY, Scope};
use crate::repositories::job::{JobChanges, JobFilter, NewJob};
use crate::repositories::{CompanyRepository, JobRepository};
use crate::server::AppState;

/// Largest salary representable as DECIMAL(10, 2)
const SALARY_LIMIT: i64 = 100_000_000;

/// Job creation payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateJobRequest {
    #[schema(example = "Backend Engineer")]
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    #[schema(example = "Remote")]
    pub job_location: Option<String>,
    #[schema(value_type = Option<String>, example = "85000.00")]
    pub salary: Option<Decimal>,
    /// Defaults to `true`
    pub is_active: Option<bool>,
}

/// Partial job update; absent fields are left untouched
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateJobRequest {
    pub job_title: Option<String>,
    pub job_description: Option<String>,
    pub job_location: Option<String>,
    #[schema(value_type = Option<String>, example = "90000.00")]
    pub salary: Option<Decimal>,
    pub is_active: Option<bool>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListJobsQuery {
    /// Case-insensitive match on title, description, location or company name
    pub search: Option<String>,
    #[param(value_type = Option<String>)]
    pub salary: Option<Decimal>,
    pub job_location: Option<String>,
    pub is_active: Option<bool>,
}

/// Job posting with its company
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub company: CompanyResponse,
    pub job_title: String,
    pub job_description: String,
    pub job_location: String,
    #[schema(value_type = String, example = "85000.00")]
    pub salary: Decimal,
    pub created_at: DateTime<FixedOffset>,
    pub is_active: bool,
}

impl From<(job_listing::Model, company::Model)> for JobResponse {
    fn from((job, company): (job_listing::Model, company::Model)) -> Self {
        // SQLite hands decimals back without their scale
        let mut salary = job.salary;
        salary.rescale(2);
        Self {
            id: job.id,
            company: company.into(),
            job_title: job.job_title,
            job_description: job.job_description,
            job_location: job.job_location,
            salary,
            created_at: job.created_at,
            is_active: job.is_active,
        }
    }
}

fn check_salary(errors: &mut FieldErrors, salary: Decimal) {
    if salary.is_sign_negative() {
        errors.add("salary", "Ensure this value is greater than or equal to 0.");
    } else if salary.normalize().scale() > 2 {
        errors.add("salary", "Ensure that there are no more than 2 decimal places.");
    } else if salary >= Decimal::from(SALARY_LIMIT) {
        errors.add("salary", "Ensure that there are no more than 10 digits in total.");
    }
}

/// Visibility scope for the caller, resolving their company when they are an employer.
async fn view_scope(state: &AppState, caller: &Identity) -> Result<Scope, ApiError> {
    let company_id = if caller.is_employer() {
        CompanyRepository::new(&state.db)
            .find_by_owner(caller.user_id)
            .await?
            .map(|company| company.id)
    } else {
        None
    };

    Ok(state
        .policy
        .authorize(Some(caller), &Action::ViewJobs { company_id })?)
}

/// Post a job under the caller's company
#[utoipa::path(
    post,
    path = "/api/v1/jobs",
    security(("bearer_auth" = [])),
    request_body = CreateJobRequest,
    responses(
        (status = 201, description = "Job created", body = JobResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer", body = ApiError),
        (status = 404, description = "Caller has no company", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn create_job(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let company = if caller.identity.is_employer() {
        CompanyRepository::new(&state.db)
            .find_by_owner(caller.identity.user_id)
            .await?
    } else {
        None
    };

    state.policy.authorize(
        Some(&caller.identity),
        &Action::CreateJob {
            company_id: company.as_ref().map(|c| c.id),
        },
    )?;
    let Some(company) = company else {
        return Err(Denial::NotFound(NO_COMPANY).into());
    };

    let Json(request) = payload?;
    let mut errors = FieldErrors::default();
    let job_title = errors.required("job_title", request.job_title);
    errors.max_chars("job_title", &job_title, 200);
    let job_description = errors.required("job_description", request.job_description);
    let job_location = errors.required("job_location", request.job_location);
    errors.max_chars("job_location", &job_location, 100);
    let salary = match request.salary {
        Some(salary) => {
            check_salary(&mut errors, salary);
            salary
        }
        None => {
            errors.add("salary", super::REQUIRED);
            Decimal::ZERO
        }
    };
    errors.into_result()?;

    let job = JobRepository::new(&state.db)
        .create(
            company.id,
            NewJob {
                job_title,
                job_description,
                job_location,
                salary,
                is_active: request.is_active.unwrap_or(true),
            },
        )
        .await?;

    metrics::counter!("jobs_created_total").increment(1);
    tracing::info!(job_id = %job.id, company_id = %company.id, "Job created");

    Ok((StatusCode::CREATED, Json((job, company).into())))
}

/// Jobs visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/jobs",
    security(("bearer_auth" = [])),
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Visible jobs", body = Vec<JobResponse>),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 404, description = "Employer has no company", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn list_jobs(
    State(state): State<AppState>,
    caller: AuthUser,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let scope = view_scope(&state, &caller.identity).await?;
    let filter = JobFilter {
        search: query.search,
        salary: query.salary,
        job_location: query.job_location,
        is_active: query.is_active,
    };

    let jobs = JobRepository::new(&state.db).list(&scope, &filter).await?;

    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

/// A single job visible to the caller
#[utoipa::path(
    get,
    path = "/api/v1/jobs/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 200, description = "Job", body = JobResponse),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 404, description = "No such job visible to the caller", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn get_job(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let scope = view_scope(&state, &caller.identity).await?;
    let job_id = path_id(path, JOB_NOT_FOUND)?;
    let found = resolve_job(&state.db, &scope, job_id).await?;

    Ok(Json(found.into()))
}

/// Partially update one of the caller's jobs
#[utoipa::path(
    patch,
    path = "/api/v1/jobs/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Job id")),
    request_body = UpdateJobRequest,
    responses(
        (status = 200, description = "Job updated", body = JobResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer", body = ApiError),
        (status = 404, description = "No such job owned by the caller", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn update_job(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateJobRequest>, JsonRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::UpdateJob)?;
    let job_id = path_id(path, JOB_NOT_FOUND)?;
    let (job, company) = resolve_job(&state.db, &scope, job_id).await?;

    let Json(request) = payload?;
    let mut errors = FieldErrors::default();
    let mut changes = JobChanges::default();

    if let Some(title) = request.job_title {
        let title = errors.required("job_title", Some(title));
        errors.max_chars("job_title", &title, 200);
        changes.job_title = Some(title);
    }
    if let Some(description) = request.job_description {
        changes.job_description = Some(errors.required("job_description", Some(description)));
    }
    if let Some(location) = request.job_location {
        let location = errors.required("job_location", Some(location));
        errors.max_chars("job_location", &location, 100);
        changes.job_location = Some(location);
    }
    if let Some(salary) = request.salary {
        check_salary(&mut errors, salary);
        changes.salary = Some(salary);
    }
    changes.is_active = request.is_active;
    errors.into_result()?;

    let job = JobRepository::new(&state.db).update(job, changes).await?;
    tracing::info!(job_id = %job.id, "Job updated");

    Ok(Json((job, company).into()))
}

/// Delete a job (owning employer or staff)
#[utoipa::path(
    delete,
    path = "/api/v1/jobs/{id}",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Job id")),
    responses(
        (status = 204, description = "Job deleted"),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is neither employer nor staff", body = ApiError),
        (status = 404, description = "No such job owned by the caller", body = ApiError)
    ),
    tag = "jobs"
)]
pub async fn delete_job(
    State(state): State<AppState>,
    caller: AuthUser,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let scope = state
        .policy
        .authorize(Some(&caller.identity), &Action::DeleteJob)?;
    let job_id = path_id(path, JOB_NOT_FOUND)?;
    let (job, _) = resolve_job(&state.db, &scope, job_id).await?;

    JobRepository::new(&state.db).delete(job).await?;

    metrics::counter!("jobs_deleted_total").increment(1);
    tracing::info!(
        %job_id,
        deleted_by = %caller.identity.user_id,
        staff = caller.identity.is_staff,
        "Job deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
