//! Core data model definitions shared across runwarden crates.
#![allow(missing_docs)]

pub use ::chrono;

pub mod error;
pub mod ids;
pub mod run;

pub use error::{ModelError, Result as ModelResult};
pub use ids::{DatabaseName, RunId};
pub use run::{NoticeStage, Run, RunDisposition};
