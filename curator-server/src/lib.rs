//! # Curator Server
//!
//! HTTP surface over the curator core: bulk metadata preview/execute, job
//! inspection, misclassification review, Jellyfin sync and provider search.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::{AppParts, AppState};
pub use infra::errors::{AppError, AppResult};
pub use routes::create_app;
