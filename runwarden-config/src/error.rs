use std::path::PathBuf;

use runwarden_core::LifecycleError;
use runwarden_model::ModelError;
use thiserror::Error;

/// Failures while turning a policy file and credentials into something a
/// pass can run with. All of them are fatal for the invocation.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy file {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error(
        "no policy file given and none found (searched {})",
        display_paths(.searched)
    )]
    NotFound { searched: Vec<PathBuf> },

    #[error("invalid policy value `{field}`: {reason}")]
    GuardRail { field: &'static str, reason: String },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("failed to read secret file {path}: {source}")]
    SecretFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "no credentials for {host}:{port}; set RUNWARDEN_DB_USER/RUNWARDEN_DB_PASSWORD, \
         add an auth file entry, or run interactively"
    )]
    MissingCredentials { host: String, port: u16 },

    #[error("credential prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("invalid database URL: {source}")]
    InvalidDatabaseUrl {
        #[source]
        source: url::ParseError,
    },

    #[error("database username `{username}` cannot be encoded in a URL")]
    InvalidDatabaseUsername { username: String },

    #[error("database password cannot be encoded in a URL")]
    InvalidDatabasePassword,
}

pub type Result<T> = std::result::Result<T, PolicyError>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
