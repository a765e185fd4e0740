use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),

    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
