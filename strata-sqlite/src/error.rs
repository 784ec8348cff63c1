//! Error types for SQLite operations.

use strata_migrate::MigrationError;
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for opening and configuring SQLite connections.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Invalid connection string.
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for MigrationError {
    fn from(err: SqliteError) -> Self {
        MigrationError::database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("unknown journal mode 'fast'");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn test_error_conversion() {
        let err: SqliteError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, SqliteError::Sqlite(_)));

        let migrate: MigrationError = err.into();
        assert_eq!(migrate.kind(), strata_migrate::ErrorKind::Database);
    }
}
