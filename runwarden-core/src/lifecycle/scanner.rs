use chrono::{DateTime, Utc};
use runwarden_model::{Run, RunDisposition};
use serde::Serialize;

use crate::policy::LifecyclePolicy;

/// Runs that need action in one pass, split by stage.
///
/// The lists are disjoint and keep the order the runs were scanned in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    pub first_notice: Vec<Run>,
    pub final_notice: Vec<Run>,
    pub ready_to_purge: Vec<Run>,
}

impl ScanOutcome {
    pub fn is_empty(&self) -> bool {
        self.first_notice.is_empty()
            && self.final_notice.is_empty()
            && self.ready_to_purge.is_empty()
    }
}

/// Classifies runs against a reference instant.
///
/// Each run gets exactly one [`RunDisposition`]; downstream stages work off
/// that classification instead of re-checking timestamps.
#[derive(Debug, Clone, Copy)]
pub struct ExpirationScanner<'a> {
    policy: &'a LifecyclePolicy,
}

impl<'a> ExpirationScanner<'a> {
    pub fn new(policy: &'a LifecyclePolicy) -> Self {
        Self { policy }
    }

    pub fn classify(&self, run: &Run, now: DateTime<Utc>) -> RunDisposition {
        if run.is_deleted() {
            return RunDisposition::Deleted;
        }

        let until_expiration = run.expiration_date - now;

        match (run.first_notice_sent_at, run.final_notice_sent_at) {
            (_, Some(final_sent)) => {
                let final_aged = now - final_sent >= self.policy.grace_interval();
                let past_expiration =
                    now - run.expiration_date > self.policy.expiry_tolerance();
                if final_aged && past_expiration {
                    RunDisposition::ReadyToPurge
                } else {
                    RunDisposition::AwaitingPurge
                }
            }
            (Some(_), None) => {
                if until_expiration <= self.policy.final_notice_window() {
                    RunDisposition::NeedsFinalNotice
                } else {
                    RunDisposition::Active
                }
            }
            (None, None) => {
                if until_expiration <= self.policy.first_notice_window() {
                    RunDisposition::NeedsFirstNotice
                } else {
                    RunDisposition::Active
                }
            }
        }
    }

    pub fn scan<I>(&self, runs: I, now: DateTime<Utc>) -> ScanOutcome
    where
        I: IntoIterator<Item = Run>,
    {
        let mut outcome = ScanOutcome::default();
        for run in runs {
            match self.classify(&run, now) {
                RunDisposition::NeedsFirstNotice => outcome.first_notice.push(run),
                RunDisposition::NeedsFinalNotice => outcome.final_notice.push(run),
                RunDisposition::ReadyToPurge => outcome.ready_to_purge.push(run),
                RunDisposition::Active
                | RunDisposition::AwaitingPurge
                | RunDisposition::Deleted => {}
            }
        }
        outcome
    }
}
