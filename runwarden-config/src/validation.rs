use std::path::{Path, PathBuf};

use runwarden_core::{LifecyclePolicy, NoticeSettings};
use runwarden_model::{DatabaseName, chrono::Duration};

use crate::{
    error::{PolicyError, Result},
    models::{ConnectionSettings, PolicyFile},
};

/// A policy file that passed every guard rail.
#[derive(Debug, Clone)]
pub struct ValidatedPolicy {
    pub lifecycle: LifecyclePolicy,
    pub connection: ConnectionSettings,
    pub auth_file: Option<PathBuf>,
}

fn guard(field: &'static str, reason: impl Into<String>) -> PolicyError {
    PolicyError::GuardRail {
        field,
        reason: reason.into(),
    }
}

fn hours(value: u32) -> Duration {
    Duration::hours(i64::from(value))
}

fn non_empty(field: &'static str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(guard(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

impl PolicyFile {
    /// Check every value and build the runtime policy.
    ///
    /// `home` is used to expand a leading `~/` in the auth file path.
    pub fn validate(&self, home: Option<&Path>) -> Result<ValidatedPolicy> {
        let host = non_empty("database.host", &self.database.host)?;
        if self.database.port == 0 {
            return Err(guard("database.port", "must be between 1 and 65535"));
        }
        let global_db = DatabaseName::parse(non_empty(
            "database.global_db",
            &self.database.global_db,
        )?)?;
        let run_table = DatabaseName::parse(non_empty(
            "database.run_table",
            &self.database.run_table,
        )?)?;

        let cleanup = &self.cleanup;
        if cleanup.final_notice_days > cleanup.first_notice_days {
            return Err(guard(
                "cleanup.final_notice_days",
                format!(
                    "{} is larger than cleanup.first_notice_days ({})",
                    cleanup.final_notice_days, cleanup.first_notice_days
                ),
            ));
        }
        if cleanup.grace_hours == 0 {
            return Err(guard("cleanup.grace_hours", "must be positive"));
        }

        let notifications = &self.notifications;
        let settings = NoticeSettings::new(non_empty(
            "notifications.recipient",
            &notifications.recipient,
        )?)?
        .with_subject(non_empty("notifications.subject", &notifications.subject)?)
        .with_signature(notifications.sender_signature.trim());

        let lifecycle = LifecyclePolicy::new(global_db.clone(), settings)
            .with_notice_windows(cleanup.first_notice_days, cleanup.final_notice_days)?
            .with_grace_interval(hours(cleanup.grace_hours))?
            .with_expiry_tolerance(hours(cleanup.expiry_tolerance_hours))?;

        Ok(ValidatedPolicy {
            lifecycle,
            connection: ConnectionSettings {
                host,
                port: self.database.port,
                global_db,
                run_table: run_table.as_str().to_string(),
            },
            auth_file: self
                .credentials
                .auth_file
                .as_deref()
                .map(|path| expand_home(path, home))
                .transpose()?,
        })
    }
}

fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => Ok(home.join(rest)),
        (Ok(_), None) => Err(guard(
            "credentials.auth_file",
            "starts with `~` but no home directory is known",
        )),
        (Err(_), _) => Ok(path.to_path_buf()),
    }
}
