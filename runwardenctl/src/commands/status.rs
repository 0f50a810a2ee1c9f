use std::fmt::Write as _;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use runwarden_core::lifecycle::ScanOutcome;
use runwarden_model::Run;

use crate::context::AppContext;

pub async fn run(ctx: &AppContext, now: DateTime<Utc>, json: bool) -> Result<()> {
    let scan = ctx
        .orchestrator()
        .preview(now)
        .await
        .context("failed to scan run registry")?;

    let rendered = if json {
        serde_json::to_string_pretty(&scan).context("failed to encode scan")?
    } else {
        render_table(&scan, now)
    };
    println!("{rendered}");
    Ok(())
}

fn render_table(scan: &ScanOutcome, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "as of {}", now.to_rfc3339());
    if scan.is_empty() {
        let _ = writeln!(out, "nothing due");
        return out;
    }

    let sections: [(&str, &[Run]); 3] = [
        ("final notice", scan.final_notice.as_slice()),
        ("first notice", scan.first_notice.as_slice()),
        ("ready to purge", scan.ready_to_purge.as_slice()),
    ];
    for (label, runs) in sections {
        if runs.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{label} ({}):", runs.len());
        for run in runs {
            let _ = writeln!(
                out,
                "  {:>8}  {:<24}  {:<40}  expires {}",
                run.id.as_i64(),
                run.run_name,
                run.database_name.as_str(),
                run.expiration_date.format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    out
}
