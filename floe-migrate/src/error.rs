//! Error types for the migration engine.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrateError>;

/// Errors that can occur while reconciling or applying migrations.
///
/// Everything here is fatal to the run; the only retry anywhere in the
/// engine is the mutation poll loop, which is bounded by its timeout.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database operation error, as reported by the driver.
    #[error("database error: {0}")]
    Database(String),

    /// A file with a migration extension whose name carries no version.
    #[error("malformed migration filename '{path}': expected <digits>_<name>.<sql|json>")]
    MalformedFilename {
        /// Offending file name.
        path: String,
    },

    /// Two migrations (on disk or in the ledger) share a version number.
    #[error("duplicate migration version {0}")]
    DuplicateVersion(u32),

    /// The ledger records migrations whose files are no longer on disk.
    #[error(
        "migrations have gone missing ({detail}); the code base must not \
         truncate migrations, correct older migrations with new ones"
    )]
    MissingMigrations {
        /// What exactly is missing.
        detail: String,
    },

    /// An already-applied migration's content changed on disk.
    #[error(
        "migration {version} was edited after it ran (ledger fingerprint \
         {expected}, file fingerprint {actual}); do not edit applied \
         migrations, correct them with new ones"
    )]
    TamperedMigration {
        /// Migration version.
        version: u32,
        /// Fingerprint recorded at apply time.
        expected: String,
        /// Fingerprint of the file as it is now.
        actual: String,
    },

    /// A migration statement failed; the run stops here.
    #[error("migration {version} failed on statement: {statement}")]
    Execution {
        /// Migration version.
        version: u32,
        /// The statement that failed.
        statement: String,
        /// The underlying error.
        #[source]
        source: Box<MigrateError>,
    },

    /// Queued mode gave up waiting for a background mutation.
    #[error(
        "timed out after {timeout:?} waiting for mutations triggered by: {statement}"
    )]
    MutationTimeout {
        /// The statement whose mutations never finished.
        statement: String,
        /// The configured wait timeout.
        timeout: Duration,
    },

    /// A structured migration file did not hold a list of statements.
    #[error("invalid statement list in '{path}': {reason}")]
    InvalidStatements {
        /// Path of the offending file.
        path: String,
        /// Parse failure detail.
        reason: String,
    },
}

impl MigrateError {
    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a missing-migrations error.
    pub fn missing(detail: impl Into<String>) -> Self {
        Self::MissingMigrations {
            detail: detail.into(),
        }
    }

    /// Whether this error indicates tampered or vanished history.
    pub fn is_drift(&self) -> bool {
        matches!(
            self,
            Self::MissingMigrations { .. } | Self::TamperedMigration { .. }
        )
    }
}
