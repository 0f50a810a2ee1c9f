use chrono::Duration;
use runwarden_model::DatabaseName;

use crate::error::{LifecycleError, Result};

pub const DEFAULT_FIRST_NOTICE_DAYS: u32 = 7;
pub const DEFAULT_FINAL_NOTICE_DAYS: u32 = 1;
pub const DEFAULT_GRACE_HOURS: u32 = 24;
pub const DEFAULT_EXPIRY_TOLERANCE_HOURS: u32 = 23;
pub const DEFAULT_NOTICE_SUBJECT: &str = "Purging expired runs";
pub const DEFAULT_NOTICE_SIGNATURE: &str = "The Database Team";

/// Addressing and wording for the notices sent to run owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeSettings {
    pub recipient: String,
    pub subject: String,
    pub signature: String,
}

impl NoticeSettings {
    pub fn new(recipient: impl Into<String>) -> Result<Self> {
        let recipient = recipient.into();
        if recipient.trim().is_empty() {
            return Err(LifecycleError::InvalidPolicy(
                "notice recipient must not be empty".to_string(),
            ));
        }
        Ok(Self {
            recipient,
            subject: DEFAULT_NOTICE_SUBJECT.to_string(),
            signature: DEFAULT_NOTICE_SIGNATURE.to_string(),
        })
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }
}

/// Thresholds and names a lifecycle pass runs under.
///
/// Constructed once per invocation and never mutated during a pass. All
/// setters validate, so a `LifecyclePolicy` value is always usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    first_notice_days: u32,
    final_notice_days: u32,
    grace_interval: Duration,
    expiry_tolerance: Duration,
    global_database: DatabaseName,
    notices: NoticeSettings,
}

impl LifecyclePolicy {
    pub fn new(global_database: DatabaseName, notices: NoticeSettings) -> Self {
        Self {
            first_notice_days: DEFAULT_FIRST_NOTICE_DAYS,
            final_notice_days: DEFAULT_FINAL_NOTICE_DAYS,
            grace_interval: Duration::hours(i64::from(DEFAULT_GRACE_HOURS)),
            expiry_tolerance: Duration::hours(i64::from(
                DEFAULT_EXPIRY_TOLERANCE_HOURS,
            )),
            global_database,
            notices,
        }
    }

    /// Set both notice windows, in days before expiration.
    ///
    /// The final window must not be wider than the first one, otherwise a run
    /// could become due for its final notice before its first.
    pub fn with_notice_windows(
        mut self,
        first_notice_days: u32,
        final_notice_days: u32,
    ) -> Result<Self> {
        if final_notice_days > first_notice_days {
            return Err(LifecycleError::InvalidPolicy(format!(
                "final notice window ({final_notice_days}d) is wider than first notice window ({first_notice_days}d)"
            )));
        }
        self.first_notice_days = first_notice_days;
        self.final_notice_days = final_notice_days;
        Ok(self)
    }

    pub fn with_grace_interval(mut self, grace_interval: Duration) -> Result<Self> {
        if grace_interval <= Duration::zero() {
            return Err(LifecycleError::InvalidPolicy(
                "grace interval must be positive".to_string(),
            ));
        }
        self.grace_interval = grace_interval;
        Ok(self)
    }

    pub fn with_expiry_tolerance(mut self, tolerance: Duration) -> Result<Self> {
        if tolerance < Duration::zero() {
            return Err(LifecycleError::InvalidPolicy(
                "expiry tolerance must not be negative".to_string(),
            ));
        }
        self.expiry_tolerance = tolerance;
        Ok(self)
    }

    pub fn first_notice_days(&self) -> u32 {
        self.first_notice_days
    }

    pub fn final_notice_days(&self) -> u32 {
        self.final_notice_days
    }

    pub fn first_notice_window(&self) -> Duration {
        Duration::days(i64::from(self.first_notice_days))
    }

    pub fn final_notice_window(&self) -> Duration {
        Duration::days(i64::from(self.final_notice_days))
    }

    /// Minimum age of the final notice before a purge is allowed.
    pub fn grace_interval(&self) -> Duration {
        self.grace_interval
    }

    /// How far past expiration a run must be before it counts as expired.
    pub fn expiry_tolerance(&self) -> Duration {
        self.expiry_tolerance
    }

    /// Database holding the run registry. Never eligible for purge.
    pub fn global_database(&self) -> &DatabaseName {
        &self.global_database
    }

    pub fn notices(&self) -> &NoticeSettings {
        &self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LifecyclePolicy {
        LifecyclePolicy::new(
            DatabaseName::parse("runs_global").unwrap(),
            NoticeSettings::new("pipeline-owners").unwrap(),
        )
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let policy = policy();
        assert_eq!(policy.first_notice_window(), Duration::days(7));
        assert_eq!(policy.final_notice_window(), Duration::days(1));
        assert_eq!(policy.grace_interval(), Duration::hours(24));
        assert_eq!(policy.expiry_tolerance(), Duration::hours(23));
        assert_eq!(policy.notices().subject, DEFAULT_NOTICE_SUBJECT);
    }

    #[test]
    fn final_window_wider_than_first_is_rejected() {
        let err = policy().with_notice_windows(2, 3).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidPolicy(_)));
        assert!(policy().with_notice_windows(3, 3).is_ok());
    }

    #[test]
    fn non_positive_grace_is_rejected() {
        assert!(policy().with_grace_interval(Duration::zero()).is_err());
        assert!(policy().with_expiry_tolerance(Duration::hours(-1)).is_err());
    }

    #[test]
    fn blank_recipient_is_rejected() {
        assert!(NoticeSettings::new("   ").is_err());
    }
}
