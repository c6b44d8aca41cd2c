//! Infrastructure layer: repositories, object storage, application services, config.
//!
//! - `repository`: persistence ports and their in-memory / Postgres adapters
//! - `storage`: object storage for variant images
//! - `services`: the catalog and order use cases, wired by constructor injection
//! - `config`: environment-driven process configuration

pub mod config;
pub mod repository;
pub mod services;
pub mod storage;
