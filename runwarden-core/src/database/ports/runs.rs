use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runwarden_model::{NoticeStage, Run, RunId};

use crate::Result;

/// Read/write access to the run table.
///
/// Every write is set-once: a timestamp that is already present is left
/// untouched, so replaying an update after a partial failure is harmless.
#[async_trait]
pub trait RunRegistry: Send + Sync {
    /// All runs that have not been deleted, ordered by id.
    async fn list_live_runs(&self) -> Result<Vec<Run>>;

    async fn get_run(&self, id: RunId) -> Result<Option<Run>>;

    /// Record that `stage` was sent for `ids`. Returns how many rows changed;
    /// runs whose stage timestamp was already set are not counted.
    async fn mark_notice_sent(
        &self,
        stage: NoticeStage,
        ids: &[RunId],
        at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Record the deletion of a run. Returns `false` if it was already marked.
    async fn mark_deleted(&self, id: RunId, at: DateTime<Utc>) -> Result<bool>;

    /// Move the expiration date of a live run. Notice timestamps are kept.
    async fn extend_run(
        &self,
        id: RunId,
        new_expiration: DateTime<Utc>,
    ) -> Result<()>;
}
