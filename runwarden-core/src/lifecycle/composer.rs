use std::fmt::Write as _;

use runwarden_model::{NoticeStage, Run, RunId};
use serde::Serialize;

use crate::policy::LifecyclePolicy;

/// A rendered notice ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub stage: NoticeStage,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Runs this notice covers, in body order.
    pub run_ids: Vec<RunId>,
}

/// Result of composing one stage.
///
/// `Empty` is the sentinel for a stage with no runs; it is never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposedNotice {
    Empty(NoticeStage),
    Ready(Notice),
}

impl ComposedNotice {
    pub fn stage(&self) -> NoticeStage {
        match self {
            ComposedNotice::Empty(stage) => *stage,
            ComposedNotice::Ready(notice) => notice.stage,
        }
    }

    pub fn into_notice(self) -> Option<Notice> {
        match self {
            ComposedNotice::Empty(_) => None,
            ComposedNotice::Ready(notice) => Some(notice),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NotificationComposer<'a> {
    policy: &'a LifecyclePolicy,
}

impl<'a> NotificationComposer<'a> {
    pub fn new(policy: &'a LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// Render the notice for `stage` covering `runs` in the order given.
    pub fn compose(&self, stage: NoticeStage, runs: &[Run]) -> ComposedNotice {
        if runs.is_empty() {
            return ComposedNotice::Empty(stage);
        }

        let settings = self.policy.notices();
        ComposedNotice::Ready(Notice {
            stage,
            recipient: settings.recipient.clone(),
            subject: format!("{} ({} notice)", settings.subject, stage),
            body: self.render_body(stage, runs),
            run_ids: runs.iter().map(|run| run.id).collect(),
        })
    }

    fn days_until_deletion(&self, stage: NoticeStage) -> u32 {
        match stage {
            NoticeStage::First => self.policy.first_notice_days(),
            NoticeStage::Final => self.policy.final_notice_days(),
        }
    }

    fn render_body(&self, stage: NoticeStage, runs: &[Run]) -> String {
        let mut body = String::new();

        // Writing into a String cannot fail.
        let _ = writeln!(body, "Hello,");
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "This is an automated {stage} notice listing runs whose databases \
             will be deleted in {} day(s).",
            self.days_until_deletion(stage)
        );
        let _ = writeln!(
            body,
            "Each run is listed as [runName, dcVersion, initiator, dbName]:"
        );
        let _ = writeln!(body);
        for run in runs {
            let _ = writeln!(
                body,
                " - {}, {}, {}, {}",
                run.run_name, run.dc_version, run.initiator, run.database_name
            );
        }
        let _ = writeln!(body);
        let _ = writeln!(
            body,
            "To prevent a run from being deleted, extend it by running the \
             following mysql commands:"
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "  USE {}", self.policy.global_database());
        let _ = writeln!(
            body,
            "  SELECT extendRun('<runName>', '<dcVersion>', '<initiator>')"
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "Regards,");
        let _ = writeln!(body, "{}", self.policy.notices().signature);
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NoticeSettings;
    use chrono::{TimeZone, Utc};
    use runwarden_model::DatabaseName;

    fn policy() -> LifecyclePolicy {
        LifecyclePolicy::new(
            DatabaseName::parse("runs_global").unwrap(),
            NoticeSettings::new("pipeline-owners")
                .unwrap()
                .with_signature("The Pipeline Team"),
        )
        .with_notice_windows(5, 2)
        .unwrap()
    }

    fn run(id: i64, name: &str) -> Run {
        Run::new(
            RunId(id),
            name,
            "DC3b",
            "jdoe",
            DatabaseName::parse(format!("jdoe_DC3b_u_{name}")).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn empty_stage_yields_sentinel() {
        let policy = policy();
        let composed = NotificationComposer::new(&policy).compose(NoticeStage::First, &[]);
        assert_eq!(composed, ComposedNotice::Empty(NoticeStage::First));
        assert!(composed.into_notice().is_none());
    }

    #[test]
    fn final_notice_lists_runs_in_input_order() {
        let policy = policy();
        let runs = vec![run(9, "rlp0009"), run(2, "rlp0002")];
        let notice = NotificationComposer::new(&policy)
            .compose(NoticeStage::Final, &runs)
            .into_notice()
            .unwrap();

        assert_eq!(notice.subject, "Purging expired runs (final notice)");
        assert_eq!(notice.recipient, "pipeline-owners");
        assert_eq!(notice.run_ids, vec![RunId(9), RunId(2)]);

        let first = notice
            .body
            .find(" - rlp0009, DC3b, jdoe, jdoe_DC3b_u_rlp0009")
            .unwrap();
        let second = notice
            .body
            .find(" - rlp0002, DC3b, jdoe, jdoe_DC3b_u_rlp0002")
            .unwrap();
        assert!(first < second);
        assert!(notice.body.contains("deleted in 2 day(s)"));
        assert!(notice.body.contains("  USE runs_global\n"));
        assert!(notice.body.ends_with("The Pipeline Team\n"));
    }

    #[test]
    fn first_notice_uses_first_window() {
        let policy = policy();
        let notice = NotificationComposer::new(&policy)
            .compose(NoticeStage::First, &[run(1, "rlp0001")])
            .into_notice()
            .unwrap();
        assert_eq!(notice.stage, NoticeStage::First);
        assert_eq!(notice.subject, "Purging expired runs (first notice)");
        assert!(notice.body.contains("deleted in 5 day(s)"));
    }

    #[test]
    fn composition_is_deterministic() {
        let policy = policy();
        let composer = NotificationComposer::new(&policy);
        let runs = vec![run(1, "a"), run(2, "b")];
        assert_eq!(
            composer.compose(NoticeStage::Final, &runs),
            composer.compose(NoticeStage::Final, &runs)
        );
    }
}
