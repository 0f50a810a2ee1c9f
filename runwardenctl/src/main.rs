//! `runwarden`: daily batch job for the run database lifecycle.

mod cli;
mod clock;
mod commands;
mod context;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cli::{Cli, Command},
    context::AppContext,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Both are resolved before any connection so bad input fails fast.
    let now = clock::resolve_now(cli.global.date.as_deref(), cli.global.now.as_deref())?;
    let (validated, source) = context::load(&cli.global)?;

    match cli.command {
        Command::Check => commands::check::run(&cli.global, validated, &source).await,
        Command::Cleanup => {
            let ctx = AppContext::connect(&cli.global, validated).await?;
            commands::cleanup::run(&ctx, now).await
        }
        Command::Status { json } => {
            let ctx = AppContext::connect(&cli.global, validated).await?;
            commands::status::run(&ctx, now, json).await
        }
        Command::Extend { run_id, until } => {
            let ctx = AppContext::connect(&cli.global, validated).await?;
            commands::extend::run(&ctx, now, run_id, &until).await
        }
    }
}
