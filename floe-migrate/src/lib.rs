//! # floe-migrate
//!
//! Migration engine for Floe, a schema-migration runner for ClickHouse.
//!
//! This crate provides:
//! - Migration file discovery and version parsing
//! - Content fingerprinting for drift detection
//! - Reconciliation of on-disk migrations against the applied ledger
//! - Sequential application with append-only history tracking
//! - Queued execution mode that waits out asynchronous mutations
//!
//! ## Architecture
//!
//! The engine scans a directory of hand-authored migration scripts,
//! compares them against the `schema_versions` ledger table in the target
//! database, and applies exactly the versions the ledger has not seen.
//! Edited or vanished history is a hard error, never repaired.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐
//! │ Source scan  │────▶│                │     ┌─────────────┐
//! └──────────────┘     │   Reconciler   │────▶│  Executor   │
//! ┌──────────────┐     │                │     └─────────────┘
//! │ Ledger rows  │────▶│                │            │
//! └──────────────┘     └────────────────┘            ▼
//!        ▲                                    ┌─────────────┐
//!        └────────────────────────────────────│ Ledger row  │
//!                                             └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use floe_migrate::{Migrator, MigratorConfig};
//!
//! async fn run(db: impl floe_migrate::Database) -> floe_migrate::MigrateResult<()> {
//!     let config = MigratorConfig::new()
//!         .migrations_dir("./migrations")
//!         .queue_exec(true);
//!
//!     let migrator = Migrator::new(config, db);
//!     migrator.initialize().await?;
//!
//!     let report = migrator.migrate().await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Migration files
//!
//! Migrations are flat files named `<version>_<description>.<ext>` (an
//! optional `V` prefix before the version is accepted):
//!
//! ```text
//! migrations/
//! ├── V1_create_sample.sql
//! ├── V2_add_guard_column.sql
//! └── V3_backfill_guard.json     # ordered list of statements
//! ```

pub mod engine;
pub mod error;
pub mod ledger;
pub mod reconcile;
pub mod source;
pub mod waiter;

// Re-exports
pub use engine::{MigrationReport, MigrationStatus, Migrator, MigratorConfig};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{Database, LEDGER_INIT_SQL, LedgerEntry};
pub use reconcile::reconcile;
pub use source::{Candidate, MigrationSource, fingerprint, load_statements};
pub use waiter::{DEFAULT_MUTATION_TIMEOUT, DEFAULT_POLL_INTERVAL, MutationWaiter};
