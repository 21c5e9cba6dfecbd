use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated on `{column}`")]
    UniqueViolation { column: String },
    /// The backend answered but refused the operation.
    #[error("backend rejected request: {message}")]
    Rejected { message: String },
    /// The backend could not be reached or answered with garbage.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct a rejection carrying the backend message verbatim.
    pub fn rejected(message: impl Into<String>) -> Self {
        StorageError::Rejected {
            message: message.into(),
        }
    }

    /// Construct a uniqueness violation tied to `column`.
    pub fn unique_violation(column: impl Into<String>) -> Self {
        StorageError::UniqueViolation {
            column: column.into(),
        }
    }

    /// Whether this error is a uniqueness violation on exactly `column`.
    pub fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, StorageError::UniqueViolation { column: c } if c == column)
    }
}
