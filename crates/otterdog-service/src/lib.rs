//! Webhook service and persisted task engine that validates and applies
//! config-touching pull requests.
//!
//! This crate is a library, not a binary: it exposes `AppState` and
//! `routes::router` for a host process to wire up with its own `tokio`
//! runtime and listener, the same way `shipper-webhook` is a library that
//! `shipper-cli` drives rather than a standalone server.

pub mod config;
pub mod engine;
pub mod github;
pub mod routes;
pub mod signature;
pub mod state;
pub mod task;
pub mod tasks;

pub use engine::TaskEngine;
pub use routes::router;
pub use state::AppState;
pub use task::{ApplyStatus, InstallationModel, InstallationStatus, PullRequestModel, TaskKind, TaskModel, TaskStatus};
