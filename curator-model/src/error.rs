use thiserror::Error;

/// Errors produced by model constructors and parsing routines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
