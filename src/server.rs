//! # Server Configuration
//!
//! Shared state, the router with its middleware stack and the OpenAPI
//! document for the job board API.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    routing::{get, patch, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::TokenIssuer;
use crate::config::AppConfig;
use crate::handlers::{self, applications, companies, employer, jobs, users};
use crate::notifications::Notifier;
use crate::policy::Policy;
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenIssuer>,
    pub policy: Policy,
    pub notifier: Notifier,
}

impl AppState {
    /// Builds the state with the notification sink selected by the mail config.
    pub fn from_config(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let notifier =
            Notifier::from_config(&config.mail).context("failed to build notification sink")?;
        Self::with_notifier(config, db, notifier)
    }

    pub fn with_notifier(
        config: AppConfig,
        db: DatabaseConnection,
        notifier: Notifier,
    ) -> anyhow::Result<Self> {
        let tokens = TokenIssuer::from_config(&config).context("failed to build token issuer")?;
        let policy = Policy::new(config.employers_may_apply);

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens: Arc::new(tokens),
            policy,
            notifier,
        })
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/token/refresh", post(users::refresh_token))
        .route("/users/role", get(users::role))
        .route("/companies", post(companies::create_company))
        .route("/companies/me", get(companies::my_company))
        .route("/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route(
            "/jobs/{id}",
            get(jobs::get_job)
                .patch(jobs::update_job)
                .delete(jobs::delete_job),
        )
        .route(
            "/applications",
            get(applications::list_applications).post(applications::create_application),
        )
        .route(
            "/applications/{id}",
            get(applications::get_application)
                .patch(applications::update_application)
                .delete(applications::delete_application),
        )
        .route(
            "/employer/applications/{id}/status",
            patch(employer::change_status),
        )
        .route(
            "/employer/jobs/{id}/applicants",
            get(employer::list_applicants),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .nest("/api/v1", api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_context_middleware))
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("invalid server address: {}", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let state = AppState::from_config(config, db)?;
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, %profile, "Server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Registers the bearer token scheme referenced by authenticated paths.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::users::register,
        crate::handlers::users::login,
        crate::handlers::users::refresh_token,
        crate::handlers::users::role,
        crate::handlers::companies::create_company,
        crate::handlers::companies::my_company,
        crate::handlers::jobs::create_job,
        crate::handlers::jobs::list_jobs,
        crate::handlers::jobs::get_job,
        crate::handlers::jobs::update_job,
        crate::handlers::jobs::delete_job,
        crate::handlers::applications::create_application,
        crate::handlers::applications::list_applications,
        crate::handlers::applications::get_application,
        crate::handlers::applications::update_application,
        crate::handlers::applications::delete_application,
        crate::handlers::employer::change_status,
        crate::handlers::employer::list_applicants,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::models::Role,
            crate::models::ApplicationStatus,
            crate::error::ApiError,
            crate::auth::TokenPair,
            crate::handlers::MessageResponse,
            crate::handlers::HealthResponse,
            crate::handlers::users::RegisterRequest,
            crate::handlers::users::LoginRequest,
            crate::handlers::users::LoginResponse,
            crate::handlers::users::RefreshRequest,
            crate::handlers::users::AccessTokenResponse,
            crate::handlers::users::RoleResponse,
            crate::handlers::companies::CreateCompanyRequest,
            crate::handlers::companies::CompanyResponse,
            crate::handlers::jobs::CreateJobRequest,
            crate::handlers::jobs::UpdateJobRequest,
            crate::handlers::jobs::JobResponse,
            crate::handlers::applications::CreateApplicationRequest,
            crate::handlers::applications::UpdateApplicationRequest,
            crate::handlers::applications::ApplicationResponse,
            crate::handlers::employer::ChangeStatusRequest,
            crate::handlers::employer::ChangeStatusResponse,
            crate::handlers::employer::CandidateSummary,
            crate::handlers::employer::ApplicantResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "users", description = "Registration, login and tokens"),
        (name = "companies", description = "Employer companies"),
        (name = "jobs", description = "Job postings"),
        (name = "applications", description = "Candidate applications"),
        (name = "employer", description = "Employer actions on applications"),
    ),
    info(
        title = "Job Board API",
        description = "Employers post jobs, candidates apply, employers review applications",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_registers_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/v1/jobs/{id}"));
        assert!(
            doc.paths
                .paths
                .contains_key("/api/v1/employer/jobs/{id}/applicants")
        );
    }
}
