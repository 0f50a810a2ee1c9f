//! Wiring from policy file to a connected registry.

use std::{env, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use runwarden_config::{
    CredentialEnv, CredentialResolver, PolicySource, ValidatedPolicy,
    database_url, load_policy,
};
use runwarden_core::{
    LifecyclePolicy,
    database::{MySqlRunStore, MySqlStoreOptions},
    lifecycle::{LifecycleOrchestrator, LogTransport},
};
use tracing::info;

use crate::cli::GlobalArgs;

pub struct AppContext {
    pub policy: Arc<LifecyclePolicy>,
    pub store: Arc<MySqlRunStore>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

pub fn load(args: &GlobalArgs) -> Result<(ValidatedPolicy, PolicySource)> {
    let cwd = env::current_dir().context("failed to read working directory")?;
    let home = env::var_os("HOME").map(PathBuf::from);
    load_policy(args.policy.as_deref(), &cwd, home.as_deref())
        .context("failed to load policy")
}

impl AppContext {
    /// Resolve credentials, connect and verify the run table is reachable.
    pub async fn connect(args: &GlobalArgs, validated: ValidatedPolicy) -> Result<Self> {
        let connection = &validated.connection;
        let (credentials, source) =
            CredentialResolver::new(CredentialEnv::from_process(), validated.auth_file.clone())
                .interactive(!args.non_interactive)
                .resolve(&connection.host, connection.port)
                .context("failed to resolve database credentials")?;
        info!(user = %credentials.user, ?source, "database credentials resolved");

        let url = database_url(connection, &credentials)?;
        let options = MySqlStoreOptions {
            run_table: connection.run_table.clone(),
            ..MySqlStoreOptions::default()
        };
        let store = MySqlRunStore::connect(&url, options).await.with_context(|| {
            format!(
                "failed to connect to {}:{}/{}",
                connection.host, connection.port, connection.global_db
            )
        })?;
        store
            .preflight()
            .await
            .context("run registry preflight failed")?;

        Ok(Self {
            policy: Arc::new(validated.lifecycle),
            store: Arc::new(store),
        })
    }

    pub fn orchestrator(&self) -> LifecycleOrchestrator {
        LifecycleOrchestrator::new(
            self.store.clone(),
            self.store.clone(),
            Arc::new(LogTransport),
            self.policy.clone(),
        )
    }
}
