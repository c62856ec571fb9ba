use thiserror::Error;

use curator_model::ModelError;

#[derive(Error, Debug)]
pub enum CuratorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Preview token expired")]
    TokenExpired,

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("External system error: {0}")]
    External(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CuratorError {
    pub fn validation(message: impl Into<String>) -> Self {
        CuratorError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CuratorError::NotFound(message.into())
    }
}

impl From<ModelError> for CuratorError {
    fn from(err: ModelError) -> Self {
        CuratorError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CuratorError>;

impl From<crate::jellyfin::JellyfinError> for CuratorError {
    fn from(err: crate::jellyfin::JellyfinError) -> Self {
        CuratorError::External(err.to_string())
    }
}
