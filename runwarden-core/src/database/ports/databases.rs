use async_trait::async_trait;
use runwarden_model::DatabaseName;
use serde::Serialize;

/// What an idempotent drop found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    Dropped,
    AlreadyAbsent,
}

/// Schema-level operations on the server hosting run databases.
#[async_trait]
pub trait DatabaseAdmin: Send + Sync {
    /// Drop `name` if it exists. A missing database is not an error.
    async fn drop_database_if_exists(
        &self,
        name: &DatabaseName,
    ) -> crate::Result<DropOutcome>;
}
