use anyhow::Result;
use runwarden_config::{PolicySource, ValidatedPolicy};
use tracing::info;

use crate::{cli::GlobalArgs, context::AppContext};

/// Everything `cleanup` does before touching a run.
pub async fn run(
    args: &GlobalArgs,
    validated: ValidatedPolicy,
    source: &PolicySource,
) -> Result<()> {
    let policy = &validated.lifecycle;
    info!(
        path = %source.path().display(),
        first_notice_days = policy.first_notice_days(),
        final_notice_days = policy.final_notice_days(),
        grace_hours = policy.grace_interval().num_hours(),
        expiry_tolerance_hours = policy.expiry_tolerance().num_hours(),
        recipient = %policy.notices().recipient,
        "policy valid"
    );

    let ctx = AppContext::connect(args, validated).await?;
    info!(store = ?ctx.store, "run registry reachable");
    println!("ok");
    Ok(())
}
