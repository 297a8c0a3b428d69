//! Shared database fixtures for unit tests.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{init_pool, run_migrations};
use crate::models::{ApplicationStatus, Role, company, job_application, job_listing, user};

/// Migrated in-memory SQLite database on a single pooled connection.
pub async fn setup_test_db() -> DatabaseConnection {
    let config = AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        ..Default::default()
    };

    let db = init_pool(&config).await.expect("Failed to init test DB");
    run_migrations(&db).await.expect("Failed to run migrations");
    db
}

pub async fn insert_user(db: &DatabaseConnection, name: &str, role: Role) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(name.to_string()),
        email: Set(format!("{name}@example.com")),
        role: Set(role),
        is_staff: Set(false),
        password_hash: Set("unused".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn insert_company(db: &DatabaseConnection, owner: &user::Model) -> company::Model {
    company::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.id),
        company_name: Set(format!("{} Corp", owner.username)),
        company_location: Set("Remote".to_string()),
        description: Set("Makes things".to_string()),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert company")
}

pub async fn insert_job(
    db: &DatabaseConnection,
    company: &company::Model,
    active: bool,
) -> job_listing::Model {
    job_listing::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company.id),
        job_title: Set("Engineer".to_string()),
        job_description: Set("Builds things".to_string()),
        job_location: Set("Remote".to_string()),
        salary: Set(Decimal::new(100_000, 0)),
        created_at: Set(Utc::now().into()),
        is_active: Set(active),
    }
    .insert(db)
    .await
    .expect("insert job")
}

pub async fn insert_application(
    db: &DatabaseConnection,
    job: &job_listing::Model,
    candidate: &user::Model,
) -> job_application::Model {
    job_application::ActiveModel {
        id: Set(Uuid::new_v4()),
        job_id: Set(job.id),
        candidate_id: Set(candidate.id),
        resume: Set("resume.pdf".to_string()),
        cover_letter: Set(None),
        applied_at: Set(Utc::now().into()),
        status: Set(ApplicationStatus::Pending),
    }
    .insert(db)
    .await
    .expect("insert application")
}
