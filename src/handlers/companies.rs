//! # Company Registry Handlers

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use sea_orm::TransactionTrait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::FieldErrors;
use crate::auth::AuthUser;
use crate::error::{ApiError, not_found};
use crate::models::company;
use crate::policy::{Action, NO_COMPANY};
use crate::repositories::CompanyRepository;
use crate::repositories::company::NewCompany;
use crate::server::AppState;

/// Company creation payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    #[schema(example = "Acme")]
    pub company_name: Option<String>,
    #[schema(example = "Berlin")]
    pub company_location: Option<String>,
    pub description: Option<String>,
}

/// Company representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub company_name: String,
    pub company_location: String,
    pub description: String,
}

impl From<company::Model> for CompanyResponse {
    fn from(model: company::Model) -> Self {
        Self {
            id: model.id,
            company_name: model.company_name,
            company_location: model.company_location,
            description: model.description,
        }
    }
}

/// Register the caller's company
#[utoipa::path(
    post,
    path = "/api/v1/companies",
    security(("bearer_auth" = [])),
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CompanyResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer", body = ApiError),
        (status = 409, description = "Caller already owns a company or the name is taken", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn create_company(
    State(state): State<AppState>,
    caller: AuthUser,
    payload: Result<Json<CreateCompanyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CompanyResponse>), ApiError> {
    let txn = state.db.begin().await?;
    let repo = CompanyRepository::new(&txn);

    // Role and single-company checks come before the body is looked at
    let already_owns_company = repo.find_by_owner(caller.identity.user_id).await?.is_some();
    state.policy.authorize(
        Some(&caller.identity),
        &Action::CreateCompany {
            already_owns_company,
            name_taken: false,
        },
    )?;

    let Json(request) = payload?;
    let company_name = request
        .company_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let name_taken = !company_name.is_empty() && repo.name_taken(&company_name).await?;
    state.policy.authorize(
        Some(&caller.identity),
        &Action::CreateCompany {
            already_owns_company,
            name_taken,
        },
    )?;

    let mut errors = FieldErrors::default();
    let company_name = errors.required("company_name", Some(company_name));
    errors.max_chars("company_name", &company_name, 100);
    let company_location = errors.required("company_location", request.company_location);
    errors.max_chars("company_location", &company_location, 100);
    let description = errors.required("description", request.description);
    errors.into_result()?;

    let company = repo
        .create(
            caller.identity.user_id,
            NewCompany {
                company_name,
                company_location,
                description,
            },
        )
        .await?;
    txn.commit().await?;

    metrics::counter!("companies_created_total").increment(1);
    tracing::info!(company_id = %company.id, owner_id = %company.owner_id, "Company created");

    Ok((StatusCode::CREATED, Json(company.into())))
}

/// The caller's own company
#[utoipa::path(
    get,
    path = "/api/v1/companies/me",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's company", body = CompanyResponse),
        (status = 401, description = "Unauthenticated", body = ApiError),
        (status = 403, description = "Caller is not an employer", body = ApiError),
        (status = 404, description = "Caller has no company", body = ApiError)
    ),
    tag = "companies"
)]
pub async fn my_company(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<CompanyResponse>, ApiError> {
    state
        .policy
        .authorize(Some(&caller.identity), &Action::ReadOwnCompany)?;

    CompanyRepository::new(&state.db)
        .find_by_owner(caller.identity.user_id)
        .await?
        .map(|company| Json(company.into()))
        .ok_or_else(|| not_found(NO_COMPANY))
}
