use std::sync::Arc;

use chrono::{DateTime, Utc};
use runwarden_model::{NoticeStage, Run, RunId};
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::{
    database::{DatabaseAdmin, DropOutcome, RunRegistry},
    error::{LifecycleError, Result},
    lifecycle::{
        composer::{ComposedNotice, NotificationComposer},
        purge::{PurgeExecutor, PurgeOutcome},
        scanner::{ExpirationScanner, ScanOutcome},
        transport::NoticeTransport,
    },
    policy::LifecyclePolicy,
};

/// Step of a pass a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStage {
    FinalNotice,
    FirstNotice,
    Purge,
}

impl PassStage {
    fn for_notice(stage: NoticeStage) -> Self {
        match stage {
            NoticeStage::First => PassStage::FirstNotice,
            NoticeStage::Final => PassStage::FinalNotice,
        }
    }
}

/// A batch that did not complete. Its runs are picked up again next pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassFailure {
    pub stage: PassStage,
    pub run_ids: Vec<RunId>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub now: DateTime<Utc>,
    /// Runs whose final notice was sent and recorded.
    pub final_notices: Vec<RunId>,
    /// Runs whose first notice was sent and recorded.
    pub first_notices: Vec<RunId>,
    pub purged: Vec<PurgeOutcome>,
    pub failures: Vec<PassFailure>,
}

impl PassReport {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            final_notices: Vec::new(),
            first_notices: Vec::new(),
            purged: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.purged
            .iter()
            .filter(|outcome| outcome.drop == DropOutcome::Dropped)
            .count()
    }

    pub fn already_absent(&self) -> usize {
        self.purged.len() - self.dropped()
    }

    fn record_failure(&mut self, stage: PassStage, run_ids: Vec<RunId>, error: &LifecycleError) {
        warn!(?stage, runs = ?run_ids, %error, "batch failed; will retry next pass");
        self.failures.push(PassFailure {
            stage,
            run_ids,
            error: error.to_string(),
        });
    }
}

/// Sequences one pass: scan, final notices, first notices, purge.
///
/// Holds no state of its own between passes. A failed batch is recorded in
/// the [`PassReport`] and the pass moves on; only a failure to read the
/// registry aborts it.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    registry: Arc<dyn RunRegistry>,
    transport: Arc<dyn NoticeTransport>,
    purger: PurgeExecutor,
    policy: Arc<LifecyclePolicy>,
}

impl std::fmt::Debug for LifecycleOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleOrchestrator")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl LifecycleOrchestrator {
    pub fn new(
        registry: Arc<dyn RunRegistry>,
        admin: Arc<dyn DatabaseAdmin>,
        transport: Arc<dyn NoticeTransport>,
        policy: Arc<LifecyclePolicy>,
    ) -> Self {
        let purger = PurgeExecutor::new(registry.clone(), admin, policy.clone());
        Self {
            registry,
            transport,
            purger,
            policy,
        }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    /// Scan the registry without changing anything.
    pub async fn preview(&self, now: DateTime<Utc>) -> Result<ScanOutcome> {
        let runs = self.registry.list_live_runs().await?;
        Ok(ExpirationScanner::new(&self.policy).scan(runs, now))
    }

    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassReport> {
        let span = info_span!("lifecycle_pass", now = %now);
        async move {
            let scan = self.preview(now).await?;
            info!(
                final_notice = scan.final_notice.len(),
                first_notice = scan.first_notice.len(),
                ready_to_purge = scan.ready_to_purge.len(),
                "scan complete"
            );

            let mut report = PassReport::new(now);
            let final_notices = self
                .notify(NoticeStage::Final, &scan.final_notice, now, &mut report)
                .instrument(info_span!("notice_batch", stage = "final"))
                .await;
            report.final_notices = final_notices;
            let first_notices = self
                .notify(NoticeStage::First, &scan.first_notice, now, &mut report)
                .instrument(info_span!("notice_batch", stage = "first"))
                .await;
            report.first_notices = first_notices;

            for run in &scan.ready_to_purge {
                let purge = self
                    .purger
                    .purge(run, now)
                    .instrument(info_span!("purge", run_id = %run.id));
                match purge.await {
                    Ok(outcome) => report.purged.push(outcome),
                    Err(err) => {
                        report.record_failure(PassStage::Purge, vec![run.id], &err)
                    }
                }
            }

            info!(
                final_notices = report.final_notices.len(),
                first_notices = report.first_notices.len(),
                dropped = report.dropped(),
                already_absent = report.already_absent(),
                failures = report.failures.len(),
                "pass complete"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Send one stage's notice and record it. Returns the runs recorded.
    async fn notify(
        &self,
        stage: NoticeStage,
        runs: &[Run],
        now: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Vec<RunId> {
        let notice = match NotificationComposer::new(&self.policy).compose(stage, runs) {
            ComposedNotice::Ready(notice) => notice,
            empty @ ComposedNotice::Empty(_) => {
                debug!(stage = %empty.stage(), "no runs due; nothing sent");
                return Vec::new();
            }
        };

        if let Err(err) = self.transport.send(&notice).await {
            report.record_failure(PassStage::for_notice(stage), notice.run_ids, &err);
            return Vec::new();
        }

        match self
            .registry
            .mark_notice_sent(stage, &notice.run_ids, now)
            .await
        {
            Ok(changed) => {
                if changed != notice.run_ids.len() as u64 {
                    warn!(
                        %stage,
                        expected = notice.run_ids.len(),
                        changed,
                        "some notice timestamps were already set"
                    );
                }
                notice.run_ids
            }
            Err(err) => {
                report.record_failure(PassStage::for_notice(stage), notice.run_ids, &err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::InMemoryRunStore, lifecycle::transport::MockNoticeTransport,
        policy::NoticeSettings,
    };
    use chrono::{Duration, TimeZone};
    use runwarden_model::DatabaseName;

    fn policy() -> Arc<LifecyclePolicy> {
        Arc::new(LifecyclePolicy::new(
            DatabaseName::parse("runs_global").unwrap(),
            NoticeSettings::new("pipeline-owners").unwrap(),
        ))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 1).unwrap()
    }

    fn run(id: i64, expires_in: Duration) -> Run {
        Run::new(
            RunId(id),
            format!("run{id}"),
            "DC3b",
            "jdoe",
            DatabaseName::parse(format!("jdoe_run{id}")).unwrap(),
            now() + expires_in,
        )
    }

    fn orchestrator(
        store: &Arc<InMemoryRunStore>,
        transport: MockNoticeTransport,
    ) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(store.clone(), store.clone(), Arc::new(transport), policy())
    }

    #[tokio::test]
    async fn empty_lists_make_no_send_calls() {
        let store = Arc::new(InMemoryRunStore::new());
        store.insert(run(1, Duration::days(30))).await;

        let mut transport = MockNoticeTransport::new();
        transport.expect_send().times(0);

        let report = orchestrator(&store, transport).run_pass(now()).await.unwrap();
        assert!(report.is_clean());
        assert!(report.first_notices.is_empty());
        assert!(report.final_notices.is_empty());
    }

    #[tokio::test]
    async fn failed_send_records_no_timestamp() {
        let store = Arc::new(InMemoryRunStore::new());
        store.insert(run(1, Duration::days(3))).await;

        let mut transport = MockNoticeTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Err(LifecycleError::Transport("mail relay down".into())));

        let report = orchestrator(&store, transport).run_pass(now()).await.unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, PassStage::FirstNotice);
        assert_eq!(report.failures[0].run_ids, vec![RunId(1)]);
        assert_eq!(store.run(RunId(1)).await.unwrap().first_notice_sent_at, None);
    }

    #[tokio::test]
    async fn final_notices_go_out_before_first_notices() {
        let store = Arc::new(InMemoryRunStore::new());
        store.insert(run(1, Duration::days(5))).await;
        let mut due_final = run(2, Duration::hours(12));
        due_final.first_notice_sent_at = Some(now() - Duration::days(6));
        store.insert(due_final).await;

        let mut seq = mockall::Sequence::new();
        let mut transport = MockNoticeTransport::new();
        transport
            .expect_send()
            .withf(|notice| notice.stage == NoticeStage::Final)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        transport
            .expect_send()
            .withf(|notice| notice.stage == NoticeStage::First)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let report = orchestrator(&store, transport).run_pass(now()).await.unwrap();
        assert_eq!(report.final_notices, vec![RunId(2)]);
        assert_eq!(report.first_notices, vec![RunId(1)]);
        assert_eq!(
            store.run(RunId(2)).await.unwrap().final_notice_sent_at,
            Some(now())
        );
    }

    #[tokio::test]
    async fn registry_read_failure_aborts_pass() {
        let store = Arc::new(InMemoryRunStore::new());
        store
            .faults
            .fail_list
            .store(true, std::sync::atomic::Ordering::SeqCst);

        let mut transport = MockNoticeTransport::new();
        transport.expect_send().times(0);

        assert!(orchestrator(&store, transport).run_pass(now()).await.is_err());
    }
}
