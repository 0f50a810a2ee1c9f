use runwarden_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Invalid lifecycle policy: {0}")]
    InvalidPolicy(String),

    #[error("Lifecycle invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Run not found: {0}")]
    NotFound(String),

    #[error("Notice transport failed: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
