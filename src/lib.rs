//! # Job Board Library
//!
//! Core of the job board service: identity, companies, job postings and
//! applications behind an authorization policy, served over axum.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod notifications;
pub mod ownership;
pub mod policy;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
