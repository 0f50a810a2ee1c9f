//! In-process registry and database server.
//!
//! Mirrors the set-once semantics of the MySQL adapter and can be told to
//! fail specific calls, which is how the retry paths of a pass are exercised.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use runwarden_model::{DatabaseName, NoticeStage, Run, RunId};
use tokio::sync::Mutex;

use crate::{
    database::ports::{
        databases::{DatabaseAdmin, DropOutcome},
        runs::RunRegistry,
    },
    error::{LifecycleError, Result},
};

/// Calls an [`InMemoryRunStore`] should fail with a transient error.
#[derive(Debug, Default)]
pub struct FaultPlan {
    pub fail_list: AtomicBool,
    pub fail_mark_first_notice: AtomicBool,
    pub fail_mark_final_notice: AtomicBool,
    pub fail_mark_deleted: AtomicBool,
    pub fail_drop: AtomicBool,
}

impl FaultPlan {
    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(LifecycleError::Internal(format!(
                "injected failure in {operation}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: Mutex<BTreeMap<RunId, Run>>,
    databases: Mutex<BTreeSet<DatabaseName>>,
    drop_calls: Mutex<Vec<DatabaseName>>,
    pub faults: FaultPlan,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run and create its backing database.
    pub async fn insert(&self, run: Run) {
        if !run.is_deleted() {
            self.databases
                .lock()
                .await
                .insert(run.database_name.clone());
        }
        self.runs.lock().await.insert(run.id, run);
    }

    pub async fn run(&self, id: RunId) -> Option<Run> {
        self.runs.lock().await.get(&id).cloned()
    }

    pub async fn database_exists(&self, name: &DatabaseName) -> bool {
        self.databases.lock().await.contains(name)
    }

    /// Remove a database behind the registry's back, as an operator would.
    pub async fn remove_database(&self, name: &DatabaseName) {
        self.databases.lock().await.remove(name);
    }

    /// Every database name a drop was issued for, in call order.
    pub async fn drop_calls(&self) -> Vec<DatabaseName> {
        self.drop_calls.lock().await.clone()
    }
}

#[async_trait]
impl RunRegistry for InMemoryRunStore {
    async fn list_live_runs(&self) -> Result<Vec<Run>> {
        FaultPlan::check(&self.faults.fail_list, "list_live_runs")?;
        Ok(self
            .runs
            .lock()
            .await
            .values()
            .filter(|run| !run.is_deleted())
            .cloned()
            .collect())
    }

    async fn get_run(&self, id: RunId) -> Result<Option<Run>> {
        Ok(self.run(id).await)
    }

    async fn mark_notice_sent(
        &self,
        stage: NoticeStage,
        ids: &[RunId],
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let flag = match stage {
            NoticeStage::First => &self.faults.fail_mark_first_notice,
            NoticeStage::Final => &self.faults.fail_mark_final_notice,
        };
        FaultPlan::check(flag, "mark_notice_sent")?;

        let mut runs = self.runs.lock().await;
        let mut changed = 0;
        for id in ids {
            let Some(run) = runs.get_mut(id) else {
                continue;
            };
            if run.is_deleted() || run.notice_sent_at(stage).is_some() {
                continue;
            }
            match stage {
                NoticeStage::First => run.first_notice_sent_at = Some(at),
                NoticeStage::Final => run.final_notice_sent_at = Some(at),
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn mark_deleted(&self, id: RunId, at: DateTime<Utc>) -> Result<bool> {
        FaultPlan::check(&self.faults.fail_mark_deleted, "mark_deleted")?;

        let mut runs = self.runs.lock().await;
        match runs.get_mut(&id) {
            Some(run) if run.deleted_at.is_none() => {
                run.deleted_at = Some(at);
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(LifecycleError::NotFound(format!("run {id}"))),
        }
    }

    async fn extend_run(
        &self,
        id: RunId,
        new_expiration: DateTime<Utc>,
    ) -> Result<()> {
        let mut runs = self.runs.lock().await;
        let run = runs
            .get_mut(&id)
            .ok_or_else(|| LifecycleError::NotFound(format!("run {id}")))?;
        if run.is_deleted() {
            return Err(LifecycleError::InvariantViolation(format!(
                "run {id} was deleted and cannot be extended"
            )));
        }
        run.expiration_date = new_expiration;
        Ok(())
    }
}

#[async_trait]
impl DatabaseAdmin for InMemoryRunStore {
    async fn drop_database_if_exists(
        &self,
        name: &DatabaseName,
    ) -> Result<DropOutcome> {
        FaultPlan::check(&self.faults.fail_drop, "drop_database_if_exists")?;
        self.drop_calls.lock().await.push(name.clone());
        if self.databases.lock().await.remove(name) {
            Ok(DropOutcome::Dropped)
        } else {
            Ok(DropOutcome::AlreadyAbsent)
        }
    }
}
