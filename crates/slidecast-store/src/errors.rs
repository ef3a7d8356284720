//! Store error types.

use slidecast_core::SyncError;

/// Errors raised by session store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `SQLite` error.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON column encode/decode failure.
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failure.
    #[error("migration failed: {message}")]
    Migration {
        /// What went wrong.
        message: String,
    },

    /// The blocking database task panicked or was cancelled.
    #[error("store task failed: {0}")]
    Join(String),

    /// A stored row could not be turned into a record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRecord(msg) => Self::Validation(msg),
            other => Self::TransientIo(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_errors_are_transient() {
        let err = StoreError::Sqlite(rusqlite::Error::InvalidQuery);
        assert!(matches!(SyncError::from(err), SyncError::TransientIo(_)));
    }

    #[test]
    fn invalid_record_is_validation() {
        let err = StoreError::InvalidRecord("bad status".into());
        assert!(matches!(SyncError::from(err), SyncError::Validation(_)));
    }

    #[test]
    fn migration_display() {
        let err = StoreError::Migration {
            message: "v1 failed".into(),
        };
        assert_eq!(err.to_string(), "migration failed: v1 failed");
    }
}
