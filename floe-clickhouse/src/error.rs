//! Error types for ClickHouse operations.

use floe_migrate::MigrateError;
use thiserror::Error;

/// Result type for ClickHouse operations.
pub type ChResult<T> = Result<T, ChError>;

/// Errors that can occur while talking to ClickHouse.
#[derive(Debug, Error)]
pub enum ChError {
    /// Driver error.
    #[error("clickhouse error: {0}")]
    Driver(#[from] clickhouse::error::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ChError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<ChError> for MigrateError {
    fn from(err: ChError) -> Self {
        MigrateError::database(err.to_string())
    }
}
