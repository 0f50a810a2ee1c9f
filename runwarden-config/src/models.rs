//! Serde model of the policy file.
//!
//! Everything here is raw input. [`crate::validation`] turns it into a
//! [`runwarden_core::LifecyclePolicy`] plus [`ConnectionSettings`].

use std::path::PathBuf;

use runwarden_core::policy::{
    DEFAULT_EXPIRY_TOLERANCE_HOURS, DEFAULT_FINAL_NOTICE_DAYS,
    DEFAULT_FIRST_NOTICE_DAYS, DEFAULT_GRACE_HOURS, DEFAULT_NOTICE_SIGNATURE,
    DEFAULT_NOTICE_SUBJECT,
};
use runwarden_model::DatabaseName;
use serde::{Deserialize, Serialize};

pub use runwarden_core::database::DEFAULT_RUN_TABLE;

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub cleanup: CleanupSection,
    pub notifications: NotificationSection,
    #[serde(default)]
    pub credentials: CredentialsSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub global_db: String,
    #[serde(default = "default_run_table")]
    pub run_table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupSection {
    pub first_notice_days: u32,
    pub final_notice_days: u32,
    pub grace_hours: u32,
    pub expiry_tolerance_hours: u32,
}

impl Default for CleanupSection {
    fn default() -> Self {
        Self {
            first_notice_days: DEFAULT_FIRST_NOTICE_DAYS,
            final_notice_days: DEFAULT_FINAL_NOTICE_DAYS,
            grace_hours: DEFAULT_GRACE_HOURS,
            expiry_tolerance_hours: DEFAULT_EXPIRY_TOLERANCE_HOURS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSection {
    pub recipient: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    #[serde(default = "default_signature")]
    pub sender_signature: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CredentialsSection {
    /// Per-host credential store; `~/` is expanded against `$HOME`.
    pub auth_file: Option<PathBuf>,
}

/// Where to connect, after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub global_db: DatabaseName,
    pub run_table: String,
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

fn default_run_table() -> String {
    DEFAULT_RUN_TABLE.to_string()
}

fn default_subject() -> String {
    DEFAULT_NOTICE_SUBJECT.to_string()
}

fn default_signature() -> String {
    DEFAULT_NOTICE_SIGNATURE.to_string()
}
