//! The applied-migration ledger and the database seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MigrateResult;

/// A record of one applied migration.
///
/// Written exactly once, immediately after the migration's statements
/// succeed; never updated or deleted afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Migration version.
    pub version: u32,
    /// Content fingerprint recorded at apply time.
    pub fingerprint: String,
    /// Script path/identifier.
    pub script: String,
    /// When the migration was applied.
    pub applied_at: DateTime<Utc>,
}

/// Database operations the migration engine needs.
///
/// One implementation drives one strictly sequential run. The trait is
/// the seam that keeps the engine testable without a live server; the
/// production implementation lives in `floe-clickhouse`.
#[async_trait::async_trait]
pub trait Database: Send + Sync {
    /// Execute a raw statement.
    async fn execute(&self, sql: &str) -> MigrateResult<()>;

    /// Create the ledger table if it does not exist. Idempotent.
    async fn init_ledger(&self) -> MigrateResult<()>;

    /// Snapshot of every ledger row.
    async fn ledger_entries(&self) -> MigrateResult<Vec<LedgerEntry>>;

    /// Append one ledger row. Values must be bound, never interpolated.
    async fn record_applied(&self, entry: &LedgerEntry) -> MigrateResult<()>;

    /// Command text of unfinished mutations in the target database
    /// created at or after `since`.
    async fn unfinished_mutations(&self, since: DateTime<Utc>) -> MigrateResult<Vec<String>>;
}

/// DDL for the ledger table (ClickHouse).
///
/// `created_at` defaults server-side; the table is ordered by creation
/// time so the ledger reads back in apply order.
pub const LEDGER_INIT_SQL: &str = "CREATE TABLE IF NOT EXISTS schema_versions (\
    version UInt32, \
    md5 String, \
    script String, \
    created_at DateTime DEFAULT now()\
) ENGINE = MergeTree ORDER BY tuple(created_at)";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_entry_roundtrip() {
        let entry = LedgerEntry {
            version: 7,
            fingerprint: "0123456789abcdef0123456789abcdef".to_string(),
            script: "migrations/V7_add_guard.sql".to_string(),
            applied_at: Utc::now(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let back: LedgerEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_init_sql_has_ledger_columns() {
        assert!(LEDGER_INIT_SQL.contains("schema_versions"));
        assert!(LEDGER_INIT_SQL.contains("version UInt32"));
        assert!(LEDGER_INIT_SQL.contains("md5 String"));
        assert!(LEDGER_INIT_SQL.contains("created_at DateTime"));
        assert!(LEDGER_INIT_SQL.contains("ORDER BY tuple(created_at)"));
    }
}
