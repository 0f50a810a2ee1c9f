use std::sync::Arc;

use chrono::{DateTime, Utc};
use runwarden_model::{DatabaseName, Run, RunDisposition, RunId};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    database::{DatabaseAdmin, DropOutcome, RunRegistry},
    error::{LifecycleError, Result},
    lifecycle::scanner::ExpirationScanner,
    policy::LifecyclePolicy,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeOutcome {
    pub run_id: RunId,
    pub database: DatabaseName,
    pub drop: DropOutcome,
    /// `false` when the registry already carried a deletion timestamp.
    pub newly_marked: bool,
}

/// Drops a run's database, then records the deletion.
///
/// The two steps are not atomic. A failure between them leaves the run
/// ready-to-purge, and the retry finds the database already absent.
#[derive(Clone)]
pub struct PurgeExecutor {
    registry: Arc<dyn RunRegistry>,
    admin: Arc<dyn DatabaseAdmin>,
    policy: Arc<LifecyclePolicy>,
}

impl std::fmt::Debug for PurgeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurgeExecutor")
            .field("global_database", self.policy.global_database())
            .finish_non_exhaustive()
    }
}

impl PurgeExecutor {
    pub fn new(
        registry: Arc<dyn RunRegistry>,
        admin: Arc<dyn DatabaseAdmin>,
        policy: Arc<LifecyclePolicy>,
    ) -> Self {
        Self {
            registry,
            admin,
            policy,
        }
    }

    pub async fn purge(&self, run: &Run, now: DateTime<Utc>) -> Result<PurgeOutcome> {
        self.guard(run, now)?;

        let drop = self.admin.drop_database_if_exists(&run.database_name).await?;
        if drop == DropOutcome::AlreadyAbsent {
            warn!(
                run_id = %run.id,
                database = %run.database_name,
                "database already absent; recording deletion"
            );
        }

        let newly_marked = self.registry.mark_deleted(run.id, now).await?;
        info!(
            run_id = %run.id,
            run_name = %run.run_name,
            database = %run.database_name,
            ?drop,
            "purged run"
        );

        Ok(PurgeOutcome {
            run_id: run.id,
            database: run.database_name.clone(),
            drop,
            newly_marked,
        })
    }

    fn guard(&self, run: &Run, now: DateTime<Utc>) -> Result<()> {
        if &run.database_name == self.policy.global_database() {
            return Err(LifecycleError::InvariantViolation(format!(
                "run {} points at the global database `{}`",
                run.id, run.database_name
            )));
        }

        let disposition = ExpirationScanner::new(&self.policy).classify(run, now);
        if disposition != RunDisposition::ReadyToPurge {
            return Err(LifecycleError::InvariantViolation(format!(
                "run {} is {disposition}, not ready to purge",
                run.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{database::InMemoryRunStore, policy::NoticeSettings};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::Ordering;

    fn policy() -> Arc<LifecyclePolicy> {
        Arc::new(LifecyclePolicy::new(
            DatabaseName::parse("runs_global").unwrap(),
            NoticeSettings::new("pipeline-owners").unwrap(),
        ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn expired_run(id: i64, database: &str) -> Run {
        let mut run = Run::new(
            RunId(id),
            format!("run{id}"),
            "DC3b",
            "jdoe",
            DatabaseName::parse(database).unwrap(),
            now() - Duration::days(2),
        );
        run.first_notice_sent_at = Some(now() - Duration::days(9));
        run.final_notice_sent_at = Some(now() - Duration::hours(25));
        run
    }

    fn executor(store: &Arc<InMemoryRunStore>) -> PurgeExecutor {
        PurgeExecutor::new(store.clone(), store.clone(), policy())
    }

    #[tokio::test]
    async fn drops_then_marks() {
        let store = Arc::new(InMemoryRunStore::new());
        let run = expired_run(1, "jdoe_run1");
        store.insert(run.clone()).await;

        let outcome = executor(&store).purge(&run, now()).await.unwrap();
        assert_eq!(outcome.drop, DropOutcome::Dropped);
        assert!(outcome.newly_marked);
        assert!(!store.database_exists(&run.database_name).await);
        assert_eq!(store.run(RunId(1)).await.unwrap().deleted_at, Some(now()));
    }

    #[tokio::test]
    async fn refuses_global_database() {
        let store = Arc::new(InMemoryRunStore::new());
        let run = expired_run(1, "runs_global");
        store.insert(run.clone()).await;

        let err = executor(&store).purge(&run, now()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvariantViolation(_)));
        assert!(store.drop_calls().await.is_empty());
    }

    #[tokio::test]
    async fn refuses_run_not_ready() {
        let store = Arc::new(InMemoryRunStore::new());
        let mut run = expired_run(1, "jdoe_run1");
        run.final_notice_sent_at = Some(now() - Duration::hours(2));
        store.insert(run.clone()).await;

        let err = executor(&store).purge(&run, now()).await.unwrap_err();
        assert!(matches!(err, LifecycleError::InvariantViolation(_)));
        assert!(store.database_exists(&run.database_name).await);
    }

    #[tokio::test]
    async fn failed_mark_leaves_run_retryable() {
        let store = Arc::new(InMemoryRunStore::new());
        let run = expired_run(1, "jdoe_run1");
        store.insert(run.clone()).await;
        let executor = executor(&store);

        store.faults.fail_mark_deleted.store(true, Ordering::SeqCst);
        assert!(executor.purge(&run, now()).await.is_err());
        assert!(!store.database_exists(&run.database_name).await);
        assert_eq!(store.run(RunId(1)).await.unwrap().deleted_at, None);

        store.faults.fail_mark_deleted.store(false, Ordering::SeqCst);
        let outcome = executor.purge(&run, now()).await.unwrap();
        assert_eq!(outcome.drop, DropOutcome::AlreadyAbsent);
        assert!(outcome.newly_marked);
    }
}
