//! MySQL adapter for the run registry and run database administration.
//!
//! The run table lives in the global database. Column names follow the
//! pipeline's existing schema:
//!
//! | column           | meaning                      |
//! |------------------|------------------------------|
//! | `runInfoId`      | run id                       |
//! | `runName`        | run name                     |
//! | `dcVersion`      | data challenge version       |
//! | `initiator`      | owner                        |
//! | `dbName`         | backing database             |
//! | `expDate`        | expiration (`DATETIME`, UTC) |
//! | `firstNotifDate` | first notice sent            |
//! | `finalNotifDate` | final notice sent            |
//! | `delDate`        | database dropped             |

use std::{fmt, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use runwarden_model::{DatabaseName, ModelError, NoticeStage, Run, RunId};
use sqlx::{MySql, MySqlPool, QueryBuilder, mysql::MySqlPoolOptions};
use tracing::{debug, info, warn};

use crate::{
    database::ports::{
        databases::{DatabaseAdmin, DropOutcome},
        runs::RunRegistry,
    },
    error::{LifecycleError, Result},
};

pub const DEFAULT_RUN_TABLE: &str = "RunInfo";

const RUN_COLUMNS: &str = "CAST(runInfoId AS SIGNED) AS runInfoId, runName, dcVersion, \
     initiator, dbName, expDate, firstNotifDate, finalNotifDate, delDate";

/// Pool settings for [`MySqlRunStore::connect`].
#[derive(Debug, Clone)]
pub struct MySqlStoreOptions {
    pub max_connections: u32,
    pub acquire_timeout: StdDuration,
    pub run_table: String,
}

impl Default for MySqlStoreOptions {
    fn default() -> Self {
        Self {
            // A pass is strictly sequential; one spare connection covers
            // the preflight probe.
            max_connections: 2,
            acquire_timeout: StdDuration::from_secs(30),
            run_table: DEFAULT_RUN_TABLE.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct MySqlRunStore {
    pool: MySqlPool,
    table: String,
    table_name: String,
}

impl fmt::Debug for MySqlRunStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlRunStore")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("table", &self.table_name)
            .finish()
    }
}

impl MySqlRunStore {
    pub async fn connect(url: &str, options: MySqlStoreOptions) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .test_before_acquire(true)
            .connect(url)
            .await?;

        info!(
            max_connections = options.max_connections,
            table = %options.run_table,
            "run registry pool initialized"
        );

        Self::from_pool(pool, &options.run_table)
    }

    /// Wrap an existing pool. The table name goes through the same
    /// identifier validation as database names since it is spliced into SQL.
    pub fn from_pool(pool: MySqlPool, run_table: &str) -> Result<Self> {
        let table = DatabaseName::parse(run_table)?;
        Ok(Self {
            pool,
            table: table.quoted(),
            table_name: table.as_str().to_string(),
        })
    }

    /// Verify the run table is reachable from the connected database.
    pub async fn preflight(&self) -> Result<()> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(&self.table_name)
        .fetch_one(&self.pool)
        .await?;

        if found == 0 {
            return Err(LifecycleError::NotFound(format!(
                "run table `{}` does not exist in the connected database",
                self.table_name
            )));
        }
        Ok(())
    }

    async fn fetch_run(&self, id: RunId) -> Result<Option<Run>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM {} WHERE runInfoId = ?",
            self.table
        );
        let row = sqlx::query_as::<_, RunRow>(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Run::try_from).transpose()
    }
}

fn notice_column(stage: NoticeStage) -> &'static str {
    match stage {
        NoticeStage::First => "firstNotifDate",
        NoticeStage::Final => "finalNotifDate",
    }
}

fn to_utc(value: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    value.map(|naive| naive.and_utc())
}

// Every column except the id is optional here so that one bad row fails its
// own conversion instead of the whole fetch.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
#[sqlx(rename_all = "camelCase")]
struct RunRow {
    run_info_id: i64,
    run_name: Option<String>,
    dc_version: Option<String>,
    initiator: Option<String>,
    db_name: Option<String>,
    exp_date: Option<NaiveDateTime>,
    first_notif_date: Option<NaiveDateTime>,
    final_notif_date: Option<NaiveDateTime>,
    del_date: Option<NaiveDateTime>,
}

impl TryFrom<RunRow> for Run {
    type Error = LifecycleError;

    fn try_from(row: RunRow) -> Result<Self> {
        let id = row.run_info_id;
        let invalid = |what: &str| ModelError::InvalidRun(format!("run {id} {what}"));

        let database_name = DatabaseName::parse(row.db_name.unwrap_or_default())?;
        let expiration = row.exp_date.ok_or_else(|| invalid("has no expDate"))?;
        // Owners extend runs by name, so a nameless row cannot be noticed.
        let run_name = row
            .run_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| invalid("has an empty runName"))?;

        Ok(Run {
            id: RunId(id),
            run_name,
            dc_version: row.dc_version.unwrap_or_default(),
            initiator: row.initiator.unwrap_or_default(),
            database_name,
            expiration_date: expiration.and_utc(),
            first_notice_sent_at: to_utc(row.first_notif_date),
            final_notice_sent_at: to_utc(row.final_notif_date),
            deleted_at: to_utc(row.del_date),
        })
    }
}

/// Convert live rows, dropping the ones that cannot become a [`Run`].
///
/// A malformed row stays in the table, so failing the whole listing would
/// stall every later pass on it.
fn convert_live_rows(rows: Vec<RunRow>) -> Vec<Run> {
    rows.into_iter()
        .filter_map(|row| {
            let run_id = row.run_info_id;
            match Run::try_from(row) {
                Ok(run) => Some(run),
                Err(error) => {
                    warn!(run_id, %error, "skipping malformed run row");
                    None
                }
            }
        })
        .collect()
}

#[async_trait]
impl RunRegistry for MySqlRunStore {
    async fn list_live_runs(&self) -> Result<Vec<Run>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM {} WHERE delDate IS NULL ORDER BY runInfoId",
            self.table
        );
        let rows = sqlx::query_as::<_, RunRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        let fetched = rows.len();
        let runs = convert_live_rows(rows);
        if runs.len() < fetched {
            warn!(
                skipped = fetched - runs.len(),
                "some live runs were left out of this pass"
            );
        }
        debug!(count = runs.len(), "loaded live runs");
        Ok(runs)
    }

    async fn get_run(&self, id: RunId) -> Result<Option<Run>> {
        self.fetch_run(id).await
    }

    async fn mark_notice_sent(
        &self,
        stage: NoticeStage,
        ids: &[RunId],
        at: DateTime<Utc>,
    ) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let column = notice_column(stage);
        let mut builder = QueryBuilder::<MySql>::new(format!(
            "UPDATE {} SET {column} = ",
            self.table
        ));
        builder.push_bind(at.naive_utc());
        builder.push(" WHERE runInfoId IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_i64());
        }
        separated.push_unseparated(")");
        builder.push(format!(" AND {column} IS NULL AND delDate IS NULL"));

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn mark_deleted(&self, id: RunId, at: DateTime<Utc>) -> Result<bool> {
        let sql = format!(
            "UPDATE {} SET delDate = ? WHERE runInfoId = ? AND delDate IS NULL",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(at.naive_utc())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn extend_run(
        &self,
        id: RunId,
        new_expiration: DateTime<Utc>,
    ) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET expDate = ? WHERE runInfoId = ? AND delDate IS NULL",
            self.table
        );
        let result = sqlx::query(&sql)
            .bind(new_expiration.naive_utc())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Zero rows: unknown run, deleted run, or an unchanged value.
        match self.fetch_run(id).await? {
            None => Err(LifecycleError::NotFound(format!("run {id}"))),
            Some(run) if run.is_deleted() => {
                Err(LifecycleError::InvariantViolation(format!(
                    "run {id} was deleted and cannot be extended"
                )))
            }
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseAdmin for MySqlRunStore {
    async fn drop_database_if_exists(
        &self,
        name: &DatabaseName,
    ) -> Result<DropOutcome> {
        let existing: Option<String> = sqlx::query_scalar(
            "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        // DDL cannot take bind parameters; the name is a validated identifier.
        let statement = format!("DROP DATABASE IF EXISTS {}", name.quoted());
        sqlx::raw_sql(&statement).execute(&self.pool).await?;

        Ok(if existing.is_some() {
            DropOutcome::Dropped
        } else {
            DropOutcome::AlreadyAbsent
        })
    }
}
