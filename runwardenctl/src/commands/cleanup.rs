use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::context::AppContext;

/// One full pass. Batch failures are logged and left for the next pass;
/// only failing to read the registry is an error here.
pub async fn run(ctx: &AppContext, now: DateTime<Utc>) -> Result<()> {
    let report = ctx
        .orchestrator()
        .run_pass(now)
        .await
        .context("lifecycle pass aborted")?;

    for failure in &report.failures {
        warn!(
            stage = ?failure.stage,
            runs = ?failure.run_ids,
            error = %failure.error,
            "deferred to next pass"
        );
    }

    info!(
        now = %report.now,
        final_notices = report.final_notices.len(),
        first_notices = report.first_notices.len(),
        dropped = report.dropped(),
        already_absent = report.already_absent(),
        deferred = report.failures.len(),
        "cleanup finished"
    );
    Ok(())
}
