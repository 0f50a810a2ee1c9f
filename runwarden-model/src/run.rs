use chrono::{DateTime, Utc};

use crate::ids::{DatabaseName, RunId};

/// One row of the run registry.
///
/// Descriptive fields are fixed at creation. The three lifecycle timestamps
/// only ever move from `None` to `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Run {
    pub id: RunId,
    pub run_name: String,
    pub dc_version: String,
    pub initiator: String,
    pub database_name: DatabaseName,
    pub expiration_date: DateTime<Utc>,
    pub first_notice_sent_at: Option<DateTime<Utc>>,
    pub final_notice_sent_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Run {
    /// A fresh run that has not been through any lifecycle stage.
    pub fn new(
        id: RunId,
        run_name: impl Into<String>,
        dc_version: impl Into<String>,
        initiator: impl Into<String>,
        database_name: DatabaseName,
        expiration_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            run_name: run_name.into(),
            dc_version: dc_version.into(),
            initiator: initiator.into(),
            database_name,
            expiration_date,
            first_notice_sent_at: None,
            final_notice_sent_at: None,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Timestamp recorded for the given notice stage, if it was sent.
    pub fn notice_sent_at(&self, stage: NoticeStage) -> Option<DateTime<Utc>> {
        match stage {
            NoticeStage::First => self.first_notice_sent_at,
            NoticeStage::Final => self.final_notice_sent_at,
        }
    }
}

/// The two warning stages a run passes through before it is purged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NoticeStage {
    First,
    Final,
}

impl NoticeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeStage::First => "first",
            NoticeStage::Final => "final",
        }
    }
}

impl std::fmt::Display for NoticeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a run stands relative to a given instant, computed once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RunDisposition {
    /// Nothing to do yet.
    Active,
    NeedsFirstNotice,
    NeedsFinalNotice,
    /// Final notice sent, but the grace interval or expiry tolerance has
    /// not elapsed.
    AwaitingPurge,
    ReadyToPurge,
    /// Terminal.
    Deleted,
}

impl RunDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunDisposition::Active => "active",
            RunDisposition::NeedsFirstNotice => "needs_first_notice",
            RunDisposition::NeedsFinalNotice => "needs_final_notice",
            RunDisposition::AwaitingPurge => "awaiting_purge",
            RunDisposition::ReadyToPurge => "ready_to_purge",
            RunDisposition::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for RunDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
