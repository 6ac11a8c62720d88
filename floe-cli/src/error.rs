//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(floe::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(floe::config))]
    Config(String),

    /// Migration error
    #[error("Migration error: {0}")]
    #[diagnostic(code(floe::migration))]
    Migration(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(floe::database))]
    Database(String),
}

impl From<floe_migrate::MigrateError> for CliError {
    fn from(err: floe_migrate::MigrateError) -> Self {
        CliError::Migration(err.to_string())
    }
}

impl From<floe_clickhouse::ChError> for CliError {
    fn from(err: floe_clickhouse::ChError) -> Self {
        CliError::Database(err.to_string())
    }
}
