//! Store Errors
//!
//! Error types for storage operations.

/// Result alias used by every store trait
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the storage collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced row is missing on write, or a row is still referenced on delete
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Target row vanished between lookup and write
    #[error("Row not found: {0}")]
    RowNotFound(i64),

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Backend cannot serve the request (poisoned lock, closed pool)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// SQLSTATE for foreign_key_violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                return StoreError::ForeignKeyViolation(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

impl StoreError {
    /// Check if this error is a referential integrity failure
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, StoreError::ForeignKeyViolation(_))
    }
}

impl From<StoreError> for crate::domain::DomainError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Storage failure");
        crate::domain::DomainError::Storage(err.to_string())
    }
}
