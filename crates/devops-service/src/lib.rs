//! DevOps microservice: one message endpoint behind an API key and a
//! single-use JWT.
//!
//! Token issuance, validation and the transaction ledger live in
//! [`devops_auth`]; this crate provides the HTTP surface.
//!
//! # Modules
//!
//! - [`routes`]: HTTP endpoints (`/DevOps`, health, admin token issuance, metrics)
//! - [`payload`]: required-field and type checks for the `/DevOps` body
//! - [`state`]: Shared [`AppState`](state::AppState) owning the token authority
//! - [`config`]: Environment-driven [`ServiceConfig`](config::ServiceConfig)
//! - [`error`]: [`ServiceError`](error::ServiceError) to HTTP status mapping
//! - [`metrics`]: Prometheus counters

pub mod config;
pub mod error;
pub mod metrics;
pub mod payload;
pub mod routes;
pub mod state;

pub use config::{ConfigError, ServiceConfig};
pub use error::ServiceError;
pub use state::AppState;
