//! The migration engine: plan, apply, report.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::info;

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::{Database, LedgerEntry};
use crate::reconcile::reconcile;
use crate::source::{Candidate, MigrationSource, load_statements};
use crate::waiter::{DEFAULT_MUTATION_TIMEOUT, DEFAULT_POLL_INTERVAL, MutationWaiter};

/// Configuration for a migration run.
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Directory holding the migration scripts.
    pub migrations_dir: PathBuf,
    /// Wait for background mutations after each statement.
    pub queue_exec: bool,
    /// How long queued mode waits before giving up on a mutation.
    pub mutation_timeout: Duration,
    /// Pause between mutation polls.
    pub poll_interval: Duration,
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self {
            migrations_dir: PathBuf::from("./migrations"),
            queue_exec: false,
            mutation_timeout: DEFAULT_MUTATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl MigratorConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Enable queued execution mode.
    pub fn queue_exec(mut self, queue: bool) -> Self {
        self.queue_exec = queue;
        self
    }

    /// Set the mutation wait timeout.
    pub fn mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    /// Set the mutation poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Result of a migration run.
#[derive(Debug)]
pub struct MigrationReport {
    /// Versions applied, in apply order.
    pub applied: Vec<u32>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrationReport {
    /// Number of migrations applied.
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        if self.applied.is_empty() {
            "no migrations applied".to_string()
        } else {
            format!("{} applied in {}ms", self.applied.len(), self.duration_ms)
        }
    }
}

/// Applied-versus-pending view of the database.
#[derive(Debug)]
pub struct MigrationStatus {
    /// Ledger entries, ascending by version.
    pub applied: Vec<LedgerEntry>,
    /// Pending versions, ascending.
    pub pending: Vec<u32>,
}

/// Drives one strictly sequential migration run against one database.
///
/// Migrations run one at a time in version order; statements within a
/// migration run one at a time; in queued mode the wait for mutation
/// completion finishes before the next statement is issued. Nothing
/// stops two concurrent `Migrator`s from racing each other — running
/// migrations from more than one process at once is on the operator.
pub struct Migrator<D: Database> {
    config: MigratorConfig,
    db: D,
    source: MigrationSource,
    waiter: MutationWaiter,
}

impl<D: Database> Migrator<D> {
    /// Create a migrator over a database handle.
    pub fn new(config: MigratorConfig, db: D) -> Self {
        let source = MigrationSource::new(&config.migrations_dir);
        let waiter = MutationWaiter::new(config.mutation_timeout, config.poll_interval);
        Self {
            config,
            db,
            source,
            waiter,
        }
    }

    /// Get the database handle.
    pub fn database(&self) -> &D {
        &self.db
    }

    /// Create the ledger table if missing. Safe to call on every run.
    pub async fn initialize(&self) -> MigrateResult<()> {
        self.db.init_ledger().await
    }

    /// Compute the pending migrations without applying anything.
    pub async fn plan(&self) -> MigrateResult<Vec<Candidate>> {
        let candidates = self.source.scan().await?;
        let ledger = self.db.ledger_entries().await?;
        reconcile(candidates, ledger)
    }

    /// Applied-versus-pending view of the database.
    pub async fn status(&self) -> MigrateResult<MigrationStatus> {
        let mut applied = self.db.ledger_entries().await?;
        applied.sort_by_key(|e| e.version);
        let pending = self.plan().await?.into_iter().map(|c| c.version).collect();
        Ok(MigrationStatus { applied, pending })
    }

    /// Apply every pending migration in ascending version order.
    ///
    /// The first failing statement aborts the run; the failing migration
    /// gets no ledger row and later migrations are not attempted.
    pub async fn migrate(&self) -> MigrateResult<MigrationReport> {
        let start = Instant::now();
        let pending = self.plan().await?;

        let mut applied = Vec::with_capacity(pending.len());
        for candidate in pending {
            self.apply_one(&candidate).await?;
            applied.push(candidate.version);
        }

        Ok(MigrationReport {
            applied,
            duration_ms: start.elapsed().as_millis() as i64,
        })
    }

    async fn apply_one(&self, candidate: &Candidate) -> MigrateResult<()> {
        let statements = load_statements(&candidate.path).await?;

        for statement in &statements {
            let issued_at = Utc::now();
            self.db
                .execute(statement)
                .await
                .map_err(|e| MigrateError::Execution {
                    version: candidate.version,
                    statement: statement.clone(),
                    source: Box::new(e),
                })?;

            if self.config.queue_exec {
                self.waiter
                    .await_completion(&self.db, statement, issued_at)
                    .await?;
            }
        }

        let entry = LedgerEntry {
            version: candidate.version,
            fingerprint: candidate.fingerprint.clone(),
            script: candidate.path.display().to_string(),
            applied_at: Utc::now(),
        };
        info!(
            version = entry.version,
            script = %entry.script,
            md5 = %entry.fingerprint,
            "INSERT INTO schema_versions(version, script, md5)"
        );
        self.db.record_applied(&entry).await
    }
}
