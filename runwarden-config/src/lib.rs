//! Policy loading for runwarden.
//!
//! Turns a TOML or JSON policy file into a validated
//! [`LifecyclePolicy`](runwarden_core::LifecyclePolicy) plus connection
//! settings, and resolves the database credentials a pass runs with.

pub mod credentials;
pub mod db_url;
pub mod error;
pub mod loader;
pub mod models;
pub mod validation;

use std::path::Path;

pub use credentials::{
    CredentialEnv, CredentialResolver, CredentialSource, DbCredentials,
};
pub use db_url::database_url;
pub use error::{PolicyError, Result};
pub use loader::{PolicySource, load_from_file, locate};
pub use models::{ConnectionSettings, PolicyFile};
pub use validation::ValidatedPolicy;

/// Locate, parse and validate the policy file in one step.
///
/// A relative auth file path is taken relative to the policy file.
pub fn load_policy(
    explicit: Option<&Path>,
    base: &Path,
    home: Option<&Path>,
) -> Result<(ValidatedPolicy, PolicySource)> {
    let source = locate(explicit, base)?;
    let file = load_from_file(source.path())?;
    let mut validated = file.validate(home)?;
    if let Some(auth) = validated.auth_file.take() {
        validated.auth_file = Some(match source.path().parent() {
            Some(dir) if auth.is_relative() => dir.join(auth),
            _ => auth,
        });
    }
    tracing::info!(
        path = %source.path().display(),
        host = %validated.connection.host,
        port = validated.connection.port,
        global_db = %validated.connection.global_db,
        "policy loaded"
    );
    Ok((validated, source))
}
