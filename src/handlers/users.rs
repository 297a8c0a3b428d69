//! # Users API Handlers
//!
//! Registration, login, token refresh and the caller's own role.

use std::sync::LazyLock;

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{FieldErrors, MessageResponse};
use crate::auth::{AuthError, AuthUser, TokenKind, TokenPair, hash_password, verify_password};
use crate::error::ApiError;
use crate::models::Role;
use crate::policy::Action;
use crate::repositories::UserRepository;
use crate::repositories::user::NewUser;
use crate::server::AppState;

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid username regex"));
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
});

/// Registration payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "jane_doe")]
    pub username: Option<String>,
    #[schema(example = "jane@example.com")]
    pub email: Option<String>,
    /// `candidate` or `employer`
    #[serde(alias = "roles")]
    #[schema(example = "candidate")]
    pub role: Option<String>,
    pub password: Option<String>,
}

/// Login payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Successful login response
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    #[schema(example = "Success")]
    pub message: String,
    pub data: TokenPair,
}

/// Refresh payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Freshly minted access token
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Role and username of the caller
#[derive(Debug, Serialize, ToSchema)]
pub struct RoleResponse {
    pub role: Role,
    #[schema(example = "jane_doe")]
    pub name: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/v1/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Validation failed", body = ApiError)
    ),
    tag = "users"
)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    state.policy.authorize(None, &Action::Register)?;
    let Json(request) = payload?;

    let mut errors = FieldErrors::default();

    let username = errors.required("username", request.username);
    if !username.is_empty() {
        errors.max_chars("username", &username, 150);
        if !USERNAME_RE.is_match(&username) {
            errors.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
    }

    let email = errors.required("email", request.email);
    if !email.is_empty() {
        errors.max_chars("email", &email, 254);
        if !EMAIL_RE.is_match(&email) {
            errors.add("email", "Enter a valid email address.");
        }
    }

    let role = errors.required("role", request.role);
    let role = if role.is_empty() {
        None
    } else {
        match role.parse::<Role>() {
            Ok(role) => Some(role),
            Err(message) => {
                errors.add("role", message);
                None
            }
        }
    };

    // Passwords are taken verbatim
    let password = request.password.filter(|p| !p.is_empty());
    if password.is_none() {
        errors.add("password", super::REQUIRED);
    }

    let repo = UserRepository::new(&state.db);
    if errors.is_empty() {
        if repo.username_taken(&username).await? {
            errors.add("username", "A user with that username already exists.");
        }
        if repo.email_taken(&email).await? {
            errors.add("email", "user with this email already exists.");
        }
    }
    errors.into_result()?;

    let (Some(role), Some(password)) = (role, password) else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "Validation failed",
        ));
    };

    let password_hash = hash_password(password).await?;
    let user = repo
        .create(NewUser {
            username,
            email,
            role,
            is_staff: false,
            password_hash,
        })
        .await
        .map_err(|e| match ApiError::from(e) {
            // Lost a race with a concurrent registration
            err if err.status == StatusCode::CONFLICT => ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "A user with that username or email already exists.",
            ),
            err => err,
        })?;

    metrics::counter!("users_registered_total", "role" => role.as_str()).increment(1);
    tracing::info!(user_id = %user.id, role = %role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// Exchange credentials for an access/refresh token pair
#[utoipa::path(
    post,
    path = "/api/v1/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing fields", body = ApiError),
        (status = 401, description = "Invalid credentials", body = ApiError)
    ),
    tag = "users"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    state.policy.authorize(None, &Action::Login)?;
    let Json(request) = payload?;

    let mut errors = FieldErrors::default();
    let username = errors.required("username", request.username);
    let password = request.password.filter(|p| !p.is_empty());
    if password.is_none() {
        errors.add("password", super::REQUIRED);
    }
    errors.into_result()?;
    let password = password.unwrap_or_default();

    let user = UserRepository::new(&state.db)
        .find_by_username(&username)
        .await?;

    let verified = match &user {
        Some(user) => verify_password(password, user.password_hash.clone()).await?,
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        metrics::counter!("logins_total", "outcome" => "failed").increment(1);
        tracing::debug!(%username, "Login rejected");
        return Err(AuthError::InvalidCredentials.into());
    };

    let tokens = state.tokens.issue_pair(user.id)?;
    metrics::counter!("logins_total", "outcome" => "ok").increment(1);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: "Success".to_string(),
        data: tokens,
    }))
}

/// Mint a new access token from a refresh token
#[utoipa::path(
    post,
    path = "/api/v1/users/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 400, description = "Missing refresh token", body = ApiError),
        (status = 401, description = "Invalid or expired refresh token", body = ApiError)
    ),
    tag = "users"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    state.policy.authorize(None, &Action::RefreshToken)?;
    let Json(request) = payload?;

    let mut errors = FieldErrors::default();
    let refresh = errors.required("refresh", request.refresh);
    errors.into_result()?;

    let claims = state.tokens.verify(&refresh, TokenKind::Refresh)?;
    let user = UserRepository::new(&state.db)
        .find_by_id(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    Ok(Json(AccessTokenResponse {
        access: state.tokens.issue(user.id, TokenKind::Access)?,
    }))
}

/// Role and username of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/v1/users/role",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller role", body = RoleResponse),
        (status = 401, description = "Unauthenticated", body = ApiError)
    ),
    tag = "users"
)]
pub async fn role(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<RoleResponse>, ApiError> {
    state
        .policy
        .authorize(Some(&caller.identity), &Action::ReadOwnProfile)?;

    Ok(Json(RoleResponse {
        role: caller.user.role,
        name: caller.user.username,
    }))
}
