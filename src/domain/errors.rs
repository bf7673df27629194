//! Domain errors for the governed agents system.

use thiserror::Error;

/// Reasons a [`TaskContract`](crate::domain::models::TaskContract) is rejected
/// before any verification begins.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("Contract objective cannot be empty")]
    EmptyObjective,

    #[error("Invalid council size: {0}. Must be at least 1")]
    InvalidCouncilSize(usize),

    #[error("Invalid pass threshold: {0}. Must be within [0.0, 1.0]")]
    InvalidPassThreshold(f64),

    #[error("Required file path cannot be empty")]
    EmptyRequiredPath,

    #[error("Required file path must be relative to the working directory: {0}")]
    AbsoluteRequiredPath(String),

    #[error("Command for {gate} gate cannot be blank")]
    BlankCommand { gate: &'static str },

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),
}

/// Domain-level errors that can occur in the governed agents system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid contract: {0}")]
    InvalidContract(#[from] ContractError),

    #[error("Reputation store unavailable: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Reviewer channel error: {0}")]
    Reviewer(String),

    #[error("Verification run was cancelled")]
    Cancelled,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
