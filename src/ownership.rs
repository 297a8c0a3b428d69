//! # Ownership Resolution
//!
//! Turns a policy [`Scope`] into query predicates so that "find by id" and
//! "is owned by caller" are answered by a single statement. A record outside
//! the caller's scope is indistinguishable from a missing one.
//!
//! Scopes that do not describe the queried resource match nothing.

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, QueryTrait,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{Company, JobApplication, JobListing, company, job_application, job_listing};
use crate::policy::{JOB_NOT_FOUND, Scope};

pub const APPLICATION_NOT_FOUND: &str = "Job application not found";

fn nothing() -> Condition {
    Condition::all().add(Expr::val(1).eq(0))
}

/// Ids of the companies owned by `owner_id`, as a subquery.
fn companies_owned_by(owner_id: Uuid) -> sea_orm::sea_query::SelectStatement {
    Company::find()
        .select_only()
        .column(company::Column::Id)
        .filter(company::Column::OwnerId.eq(owner_id))
        .into_query()
}

/// Ids of the jobs posted by companies owned by `owner_id`, as a subquery.
fn jobs_owned_by(owner_id: Uuid) -> sea_orm::sea_query::SelectStatement {
    JobListing::find()
        .select_only()
        .column(job_listing::Column::Id)
        .filter(job_listing::Column::CompanyId.in_subquery(companies_owned_by(owner_id)))
        .into_query()
}

/// Predicate over `job_listings` for the given scope.
pub fn job_condition(scope: &Scope) -> Condition {
    match *scope {
        Scope::Unrestricted => Condition::all(),
        Scope::Company(company_id) => {
            Condition::all().add(job_listing::Column::CompanyId.eq(company_id))
        }
        Scope::CompanyOwner(owner_id) => Condition::all()
            .add(job_listing::Column::CompanyId.in_subquery(companies_owned_by(owner_id))),
        Scope::ActiveJobs => Condition::all().add(job_listing::Column::IsActive.eq(true)),
        Scope::Applicant(_) => nothing(),
    }
}

/// Predicate over `job_applications` for the given scope.
pub fn application_condition(scope: &Scope) -> Condition {
    match *scope {
        Scope::Unrestricted => Condition::all(),
        Scope::Applicant(candidate_id) => {
            Condition::all().add(job_application::Column::CandidateId.eq(candidate_id))
        }
        Scope::CompanyOwner(owner_id) => Condition::all()
            .add(job_application::Column::JobId.in_subquery(jobs_owned_by(owner_id))),
        Scope::Company(company_id) => Condition::all().add(
            job_application::Column::JobId.in_subquery(
                JobListing::find()
                    .select_only()
                    .column(job_listing::Column::Id)
                    .filter(job_listing::Column::CompanyId.eq(company_id))
                    .into_query(),
            ),
        ),
        Scope::ActiveJobs => nothing(),
    }
}

/// Fetch a job and its company, restricted to `scope`.
pub async fn resolve_job<C: ConnectionTrait>(
    db: &C,
    scope: &Scope,
    job_id: Uuid,
) -> Result<(job_listing::Model, company::Model), RepositoryError> {
    let found = JobListing::find_by_id(job_id)
        .filter(job_condition(scope))
        .find_also_related(Company)
        .one(db)
        .await
        .map_err(RepositoryError::database_error)?;

    match found {
        Some((job, Some(company))) => Ok((job, company)),
        _ => Err(RepositoryError::not_found(JOB_NOT_FOUND)),
    }
}

/// Fetch an application, restricted to `scope`.
pub async fn resolve_application<C: ConnectionTrait>(
    db: &C,
    scope: &Scope,
    application_id: Uuid,
) -> Result<job_application::Model, RepositoryError> {
    JobApplication::find_by_id(application_id)
        .filter(application_condition(scope))
        .one(db)
        .await
        .map_err(RepositoryError::database_error)?
        .ok_or_else(|| RepositoryError::not_found(APPLICATION_NOT_FOUND))
}

/// Unscoped job lookup returning the job together with its company owner.
///
/// Used where ownership is checked explicitly after the lookup, so that a
/// foreign job surfaces as forbidden rather than not-found.
pub async fn lookup_job<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
) -> Result<Option<(job_listing::Model, company::Model)>, RepositoryError> {
    let found = JobListing::find_by_id(job_id)
        .find_also_related(Company)
        .one(db)
        .await
        .map_err(RepositoryError::database_error)?;

    Ok(found.and_then(|(job, company)| company.map(|company| (job, company))))
}
