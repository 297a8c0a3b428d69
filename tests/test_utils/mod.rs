//! Test utilities shared by the integration suites.
//!
//! Every app runs against its own migrated in-memory SQLite database and
//! records outbound notifications instead of sending them.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use jobboard::{
    config::AppConfig,
    db::{init_pool, run_migrations},
    models::user,
    notifications::{Notification, NotificationError, NotificationSink, Notifier},
    server::{AppState, create_app},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "s3cret-Passw0rd";

/// Config for an isolated in-memory database on one pooled connection.
pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        jwt_secret: Some("integration-test-secret-integration-test".to_string()),
        ..Default::default()
    }
}

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db(config: &AppConfig) -> DatabaseConnection {
    let db = init_pool(config).await.expect("Failed to init test DB");
    run_migrations(&db).await.expect("Failed to run migrations");
    db
}

/// Keeps every delivered notification for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

impl RecordingSink {
    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().unwrap().clone()
    }

    /// Waits for background deliveries to reach `count`.
    pub async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let delivered = self.delivered();
            if delivered.len() >= count {
                return delivered;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.delivered()
    }
}

#[derive(Clone)]
pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub outbox: Arc<RecordingSink>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = test_config();
    customize(&mut config);

    let db = setup_test_db(&config).await;
    let outbox = Arc::new(RecordingSink::default());
    let notifier = Notifier::new(outbox.clone());
    let state =
        AppState::with_notifier(config, db.clone(), notifier).expect("Failed to build state");

    TestApp {
        app: create_app(state),
        db,
        outbox,
    }
}

impl TestApp {
    /// Sends one request and returns the status with the parsed JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn register(&self, username: &str, role: &str) -> (StatusCode, Value) {
        self.post(
            "/api/v1/users/register",
            None,
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "role": role,
                "password": TEST_PASSWORD,
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/users/login",
                None,
                json!({ "username": username, "password": TEST_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body
    }

    /// Registers an account and returns its access token.
    pub async fn register_and_login(&self, username: &str, role: &str) -> String {
        let (status, body) = self.register(username, role).await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");

        let body = self.login(username).await;
        body["data"]["access"].as_str().unwrap().to_string()
    }

    pub async fn make_staff(&self, username: &str) {
        let account = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .unwrap()
            .unwrap();
        let mut active: user::ActiveModel = account.into();
        active.is_staff = Set(true);
        active.update(&self.db).await.unwrap();
    }

    /// Employer with a company; returns the access token and company id.
    pub async fn employer_with_company(&self, username: &str) -> (String, String) {
        let token = self.register_and_login(username, "employer").await;
        let (status, body) = self
            .post(
                "/api/v1/companies",
                Some(&token),
                json!({
                    "company_name": format!("{username} Inc"),
                    "company_location": "Berlin",
                    "description": "We build things",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "company failed: {body}");
        (token, body["id"].as_str().unwrap().to_string())
    }

    /// Posts a job as `token` and returns its id.
    pub async fn create_job(&self, token: &str, title: &str, is_active: bool) -> String {
        let (status, body) = self
            .post(
                "/api/v1/jobs",
                Some(token),
                json!({
                    "job_title": title,
                    "job_description": "Write and review code",
                    "job_location": "Remote",
                    "salary": "85000.00",
                    "is_active": is_active,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "job failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Applies to `job_id` as `token` and returns the application id.
    pub async fn apply(&self, token: &str, job_id: &str) -> String {
        let (status, body) = self
            .post(
                "/api/v1/applications",
                Some(token),
                json!({
                    "job": job_id,
                    "resume": "resumes/cv.pdf",
                    "cover_letter": "I would love to join.",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "application failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}
