//! ClickHouse client wrapper implementing the engine's database seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::{Client, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use floe_migrate::error::{MigrateError, MigrateResult};
use floe_migrate::ledger::{Database, LEDGER_INIT_SQL, LedgerEntry};

use crate::config::ChConfig;
use crate::error::{ChError, ChResult};

/// A connection handle bound to one target database.
///
/// The HTTP interface is stateless; this handle is cheap and holds no
/// socket of its own. One handle drives one sequential migration run.
pub struct ChClient {
    inner: Client,
    database: String,
}

impl ChClient {
    /// Open a handle bound to the configured database.
    pub fn connect(config: &ChConfig) -> Self {
        let inner = base_client(config).with_database(&config.database);
        Self {
            inner,
            database: config.database.clone(),
        }
    }

    /// Create the configured database if it does not exist.
    ///
    /// Uses a handle that is not bound to the target database, since the
    /// target may not exist yet. The name is an identifier and cannot be
    /// bound as a parameter, so it is validated before being quoted in.
    pub async fn create_database(config: &ChConfig) -> ChResult<()> {
        let name = &config.database;
        if !is_valid_identifier(name) {
            return Err(ChError::config(format!("invalid database name: {name:?}")));
        }

        debug!(database = %name, "creating database if absent");
        base_client(config)
            .query(&format!("CREATE DATABASE IF NOT EXISTS `{name}`"))
            .execute()
            .await?;
        Ok(())
    }

    /// Name of the database this handle is bound to.
    pub fn database(&self) -> &str {
        &self.database
    }
}

fn base_client(config: &ChConfig) -> Client {
    let mut client = Client::default()
        .with_url(config.http_url())
        .with_user(&config.user);
    if let Some(password) = &config.password {
        client = client.with_password(password);
    }
    client
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Row, Deserialize)]
struct LedgerRow {
    version: u32,
    md5: String,
    script: String,
    #[serde(with = "clickhouse::serde::chrono::datetime")]
    created_at: DateTime<Utc>,
}

#[derive(Debug, Row, Serialize)]
struct NewLedgerRow<'a> {
    version: u32,
    md5: &'a str,
    script: &'a str,
}

#[async_trait]
impl Database for ChClient {
    async fn execute(&self, sql: &str) -> MigrateResult<()> {
        debug!(sql, "executing statement");
        self.inner
            .query(sql)
            .execute()
            .await
            .map_err(into_migrate_error)
    }

    async fn init_ledger(&self) -> MigrateResult<()> {
        self.execute(LEDGER_INIT_SQL).await
    }

    async fn ledger_entries(&self) -> MigrateResult<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = self
            .inner
            .query("SELECT version, md5, script, created_at FROM schema_versions")
            .fetch_all()
            .await
            .map_err(into_migrate_error)?;

        Ok(rows
            .into_iter()
            .map(|row| LedgerEntry {
                version: row.version,
                fingerprint: row.md5,
                script: row.script,
                applied_at: row.created_at,
            })
            .collect())
    }

    async fn record_applied(&self, entry: &LedgerEntry) -> MigrateResult<()> {
        let mut insert = self
            .inner
            .insert("schema_versions")
            .map_err(into_migrate_error)?;
        insert
            .write(&NewLedgerRow {
                version: entry.version,
                md5: &entry.fingerprint,
                script: &entry.script,
            })
            .await
            .map_err(into_migrate_error)?;
        insert.end().await.map_err(into_migrate_error)
    }

    async fn unfinished_mutations(&self, since: DateTime<Utc>) -> MigrateResult<Vec<String>> {
        // Second precision matches the DateTime column in system.mutations.
        let since = since.format("%Y-%m-%d %H:%M:%S").to_string();
        self.inner
            .query(
                "SELECT command FROM system.mutations \
                 WHERE database = ? AND is_done = 0 AND create_time >= ?",
            )
            .bind(&self.database)
            .bind(&since)
            .fetch_all::<String>()
            .await
            .map_err(into_migrate_error)
    }
}

fn into_migrate_error(err: clickhouse::error::Error) -> MigrateError {
    MigrateError::database(err.to_string())
}
