//! Error types for the migration engine.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during a migration run.
///
/// Every variant is fatal for the run. Non-fatal conditions are reported as
/// [`Warning`](crate::reconcile::Warning)s instead.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A plain file sits directly under the migrations root.
    #[error("only directories are allowed in the migrations folder: '{}'", path.display())]
    OnlyDirectoriesAllowed {
        /// Offending entry.
        path: PathBuf,
    },

    /// A group directory holds a subdirectory or a non-`.sql` file.
    #[error("only .sql files are allowed in group '{group}': '{}'", path.display())]
    OnlyUnitFilesAllowed {
        /// Group directory name.
        group: String,
        /// Offending entry.
        path: PathBuf,
    },

    /// Filesystem error while scanning or reading a unit.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The history store could not answer a summary or listing query.
    #[error("failed to read migration history: {0}")]
    HistoryRead(String),

    /// Writing history rows for an applied group failed.
    #[error("failed to record history for group '{group}': {cause}")]
    HistoryWrite {
        /// Group name.
        group: String,
        /// Driver message.
        cause: String,
    },

    /// A unit's SQL failed to apply.
    #[error("failed to execute '{unit}' in group '{group}': {cause}")]
    Execution {
        /// Group name.
        group: String,
        /// Unit file name.
        unit: String,
        /// Driver message.
        cause: String,
    },

    /// Creating or repairing the history tables failed.
    #[error("schema bootstrap failed: {0}")]
    Schema(String),

    /// Transaction control or connection failure outside of a unit.
    #[error("database error: {0}")]
    Database(String),

    /// The run was cancelled before it completed.
    #[error("migration run cancelled")]
    Cancelled,
}

/// Coarse classification of a [`MigrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Migrations folder layout violation.
    Structure,
    /// History query failure.
    HistoryRead,
    /// Filesystem failure.
    Io,
    /// Unit execution or history write failure inside the batch.
    Execution,
    /// Bootstrap failure.
    Schema,
    /// Transaction or connection failure.
    Database,
    /// Cancellation.
    Cancelled,
}

impl MigrationError {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a history read error.
    pub fn history_read(msg: impl Into<String>) -> Self {
        Self::HistoryRead(msg.into())
    }

    /// Create a history write error.
    pub fn history_write(group: impl Into<String>, cause: impl ToString) -> Self {
        Self::HistoryWrite {
            group: group.into(),
            cause: cause.to_string(),
        }
    }

    /// Create an execution error.
    pub fn execution(
        group: impl Into<String>,
        unit: impl Into<String>,
        cause: impl ToString,
    ) -> Self {
        Self::Execution {
            group: group.into(),
            unit: unit.into(),
            cause: cause.to_string(),
        }
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OnlyDirectoriesAllowed { .. } | Self::OnlyUnitFilesAllowed { .. } => {
                ErrorKind::Structure
            }
            Self::Io { .. } => ErrorKind::Io,
            Self::HistoryRead(_) => ErrorKind::HistoryRead,
            Self::HistoryWrite { .. } | Self::Execution { .. } => ErrorKind::Execution,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Database(_) => ErrorKind::Database,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Group the error is attributed to, if any.
    pub fn group(&self) -> Option<&str> {
        match self {
            Self::OnlyUnitFilesAllowed { group, .. }
            | Self::HistoryWrite { group, .. }
            | Self::Execution { group, .. } => Some(group),
            _ => None,
        }
    }
}
