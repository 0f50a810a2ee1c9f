use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidDatabaseName { name: String, reason: &'static str },
    InvalidRun(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidDatabaseName { name, reason } => {
                write!(f, "invalid database name '{name}': {reason}")
            }
            ModelError::InvalidRun(msg) => write!(f, "invalid run: {msg}"),
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
