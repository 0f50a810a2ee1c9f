use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "runwarden", version)]
#[command(
    about = "Warn owners of expiring run databases and purge the expired ones"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Policy file (TOML or JSON). Defaults to $RUNWARDEN_POLICY_PATH, then
    /// runwarden.toml or config/runwarden.toml.
    #[arg(short = 'f', long = "policy", global = true)]
    pub policy: Option<PathBuf>,

    /// Run as of this date (YYYY-MM-DD, taken as 00:00:01 UTC)
    #[arg(short = 'd', long, global = true, conflicts_with = "now")]
    pub date: Option<String>,

    /// Run as of this RFC 3339 timestamp
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Never prompt for database credentials
    #[arg(long, global = true, default_value_t = false)]
    pub non_interactive: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send due notices and purge expired runs (one full pass)
    Cleanup,

    /// Show which runs are due for a notice or purge, without changing anything
    Status {
        /// Print the scan as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Move the expiration date of a run
    Extend {
        /// Registry id of the run
        #[arg(long)]
        run_id: i64,

        /// New expiration (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        until: String,
    },

    /// Validate the policy, resolve credentials and check the run table
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "runwarden",
            "status",
            "--json",
            "-f",
            "policy.toml",
            "-d",
            "2024-03-01",
        ])
        .unwrap();
        assert_eq!(cli.global.policy, Some(PathBuf::from("policy.toml")));
        assert_eq!(cli.global.date.as_deref(), Some("2024-03-01"));
        assert!(matches!(cli.command, Command::Status { json: true }));
    }

    #[test]
    fn date_and_now_conflict() {
        let result = Cli::try_parse_from([
            "runwarden",
            "cleanup",
            "--date",
            "2024-03-01",
            "--now",
            "2024-03-01T00:00:00Z",
        ]);
        assert!(result.is_err());
    }
}
