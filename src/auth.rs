//! # Authentication
//!
//! Password hashing (argon2), access/refresh token issuance (HS256 JWT) and
//! the [`AuthUser`] extractor that turns a bearer token into the explicit
//! caller [`Identity`] consumed by the authorization policy.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ApiError, unauthorized};
use crate::models::user;
use crate::policy::Identity;
use crate::repositories::UserRepository;
use crate::server::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingCredentials,
    #[error("Authorization header must use Bearer scheme")]
    InvalidScheme,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Token has the wrong type")]
    WrongTokenType,
    #[error("Account no longer exists")]
    UnknownUser,
    #[error("Invalid Login Credentials")]
    InvalidCredentials,
    #[error("jwt secret is not configured")]
    MissingSecret,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingSecret | AuthError::Hashing(_) | AuthError::Encoding(_) => {
                anyhow::Error::new(error).into()
            }
            other => unauthorized(Some(&other.to_string())),
        }
    }
}

impl From<&user::Model> for Identity {
    fn from(user: &user::Model) -> Self {
        Identity {
            user_id: user.id,
            role: user.role,
            is_staff: user.is_staff,
        }
    }
}

/// Hash a password with a fresh salt. Runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hashing(e.to_string()))
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))?
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub async fn verify_password(password: String, password_hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || {
        let Ok(parsed) = PasswordHash::new(&password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub typ: TokenKind,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

/// Access and refresh tokens issued at login
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs and verifies bearer tokens.
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl_seconds: access_ttl_seconds as i64,
            refresh_ttl_seconds: refresh_ttl_seconds as i64,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AuthError> {
        let secret = config.jwt_secret.as_deref().ok_or(AuthError::MissingSecret)?;
        Ok(Self::new(
            secret.as_bytes(),
            config.access_token_ttl_seconds,
            config.refresh_token_ttl_seconds,
        ))
    }

    pub fn issue_pair(&self, user_id: Uuid) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access)?,
            refresh: self.issue(user_id, TokenKind::Refresh)?,
        })
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_seconds,
            TokenKind::Refresh => self.refresh_ttl_seconds,
        };
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            typ: kind,
            iat: now,
            exp: now + ttl,
            jti: Uuid::new_v4(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verify signature, expiry and token type.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 5;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            AuthError::InvalidToken
        })?;

        if data.claims.typ != expected {
            return Err(AuthError::WrongTokenType);
        }

        Ok(data.claims)
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for Arc<TokenIssuer> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.tokens)
    }
}

impl FromRef<AppState> for DatabaseConnection {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db.clone()
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidScheme)
}

/// Authenticated caller resolved from an access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub user: user::Model,
}

impl<S> FromRequestParts<S> for AuthUser
where
    Arc<TokenIssuer>: FromRef<S>,
    DatabaseConnection: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenIssuer>::from_ref(state);
        let db = DatabaseConnection::from_ref(state);

        let token = bearer_token(&parts.headers)?;
        let claims = tokens.verify(token, TokenKind::Access)?;

        let user = UserRepository::new(&db)
            .find_by_id(claims.sub)
            .await?
            .ok_or(AuthError::UnknownUser)?;

        tracing::debug!(user_id = %user.id, role = %user.role, "Authenticated request");

        Ok(AuthUser {
            identity: Identity::from(&user),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(b"unit-test-secret-unit-test-secret", 300, 3600)
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse".to_string()).await.unwrap();
        assert_ne!(hash, "correct horse");

        assert!(
            verify_password("correct horse".to_string(), hash.clone())
                .await
                .unwrap()
        );
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
        assert!(
            !verify_password("any".to_string(), "not-a-hash".to_string())
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_issued_tokens_verify_by_kind() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();
        let pair = issuer.issue_pair(user_id).unwrap();

        let claims = issuer.verify(&pair.access, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, user_id);

        assert!(matches!(
            issuer.verify(&pair.refresh, TokenKind::Access),
            Err(AuthError::WrongTokenType)
        ));
        assert!(issuer.verify(&pair.refresh, TokenKind::Refresh).is_ok());
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let other = TokenIssuer::new(b"another-secret-another-secret-xx", 300, 3600);
        let token = other.issue(Uuid::new_v4(), TokenKind::Access).unwrap();

        assert!(matches!(
            issuer().verify(&token, TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = b"unit-test-secret-unit-test-secret";
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            typ: TokenKind::Access,
            iat: now - 600,
            exp: now - 120,
            jti: Uuid::new_v4(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        assert!(matches!(
            issuer().verify(&token, TokenKind::Access),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::MissingCredentials)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dGVzdDoxMjM="));
        assert!(matches!(
            bearer_token(&headers),
            Err(AuthError::InvalidScheme)
        ));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def");
    }

    #[test]
    fn test_missing_secret_is_internal_error() {
        let config = AppConfig::default();
        let err = TokenIssuer::from_config(&config).err().unwrap();
        let api: ApiError = err.into();
        assert_eq!(api.status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
