//! # Runwarden Core
//!
//! Lifecycle engine for time-bounded experimental databases ("runs"). Each
//! run carries an expiration date; as it approaches, owners receive a first
//! and then a final notice, and once the final notice has aged past the
//! grace interval the backing database is dropped and the deletion recorded.
//!
//! ## Architecture
//!
//! - [`database`]: the [`RunRegistry`](database::RunRegistry) and
//!   [`DatabaseAdmin`](database::DatabaseAdmin) ports with MySQL and
//!   in-memory adapters
//! - [`lifecycle`]: scanner, composer, transport, purge executor and the
//!   orchestrator that sequences one pass
//! - [`policy`]: the validated configuration a pass runs under
//!
//! All lifecycle state lives in the registry. A pass is a function of the
//! registry contents and the `now` it is handed, so rerunning a pass with the
//! same inputs is safe.

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Registry and database administration ports and their adapters
pub mod database;

/// Error types and error handling utilities
pub mod error;

/// Scan, notify and purge stages plus the pass orchestrator
pub mod lifecycle;

/// Validated lifecycle policy
pub mod policy;

pub use error::{LifecycleError, Result};
pub use policy::{LifecyclePolicy, NoticeSettings};
pub use runwarden_model as model;
