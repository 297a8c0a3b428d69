//! # Data Models
//!
//! SeaORM entities for the job board plus small shared response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod company;
pub mod job_application;
pub mod job_listing;
pub mod user;

pub use company::Entity as Company;
pub use job_application::{ApplicationStatus, Entity as JobApplication};
pub use job_listing::Entity as JobListing;
pub use user::{Entity as User, Role};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "jobboard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
