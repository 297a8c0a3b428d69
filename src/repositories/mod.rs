//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations per entity. They are generic
//! over [`sea_orm::ConnectionTrait`] so the same calls run against the pool
//! or inside a transaction.

pub mod application;
pub mod company;
pub mod job;
pub mod user;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use application::ApplicationRepository;
pub use company::CompanyRepository;
pub use job::JobRepository;
pub use user::UserRepository;
