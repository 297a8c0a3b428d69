//! Database migrations for the job board.
//!
//! Uniqueness and cascade rules live here as storage constraints so that
//! concurrent requests cannot create duplicate owners, names or applications.

pub use sea_orm_migration::prelude::*;

mod m2024_06_01_000001_create_users;
mod m2024_06_01_000002_create_companies;
mod m2024_06_01_000003_create_job_listings;
mod m2024_06_01_000004_create_job_applications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_06_01_000001_create_users::Migration),
            Box::new(m2024_06_01_000002_create_companies::Migration),
            Box::new(m2024_06_01_000003_create_job_listings::Migration),
            Box::new(m2024_06_01_000004_create_job_applications::Migration),
        ]
    }
}
