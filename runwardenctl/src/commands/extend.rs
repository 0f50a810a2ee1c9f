use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use runwarden_core::database::RunRegistry;
use runwarden_model::RunId;
use tracing::{info, warn};

use crate::{clock, context::AppContext};

/// Move a run's expiration. Notice timestamps already recorded stay as they
/// are, so a run that had its final notice is purged once the new date
/// passes without another warning.
pub async fn run(
    ctx: &AppContext,
    now: DateTime<Utc>,
    run_id: i64,
    until: &str,
) -> Result<()> {
    let until = clock::parse_instant(until)?;
    let id = RunId(run_id);

    let Some(run) = ctx.store.get_run(id).await? else {
        bail!("run {id} does not exist");
    };
    if until <= now {
        warn!(run_id = %id, until = %until, "new expiration is not in the future");
    }
    if run.final_notice_sent_at.is_some() {
        warn!(
            run_id = %id,
            "final notice already sent; no further notice precedes the purge"
        );
    }

    ctx.store
        .extend_run(id, until)
        .await
        .with_context(|| format!("failed to extend run {id}"))?;
    info!(
        run_id = %id,
        run_name = %run.run_name,
        from = %run.expiration_date,
        to = %until,
        "run extended"
    );
    Ok(())
}
