//! Error types for profile storage.

use meditate_core::LedgerError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A profile with this key already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The write lost a race with another writer and may be retried.
    #[error("write conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether retrying the same write may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            match db.code().as_deref() {
                // serialization_failure, deadlock_detected
                Some("40001" | "40P01") => return Self::Conflict(db.message().to_string()),
                // unique_violation
                Some("23505") => return Self::AlreadyExists(db.message().to_string()),
                _ => {}
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(user_id) => Self::AlreadyExists { user_id },
            other => Self::StorageFailure(other.to_string()),
        }
    }
}
