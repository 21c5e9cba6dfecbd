//! Error types shared by the PostgREST storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

use super::models::ApiErrorBody;
use crate::dao::storage::StorageError;

/// Convenient result alias returning [`PostgrestDaoError`] failures.
pub type PostgrestResult<T> = Result<T, PostgrestDaoError>;

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION_CODE: &str = "23505";
const JOIN_CODE_COLUMN: &str = "join_code";

/// Failures that can occur while interacting with PostgREST.
#[derive(Debug, Error)]
pub enum PostgrestDaoError {
    /// Required environment variable is missing.
    #[error("missing PostgREST environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build PostgREST client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent.
    #[error("failed to send PostgREST request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// PostgREST answered with a non-success status.
    #[error("PostgREST responded {status} for `{path}`: {}", .body.describe())]
    RequestStatus {
        path: String,
        status: StatusCode,
        body: ApiErrorBody,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode PostgREST response for `{path}`")]
    DecodeResponse {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// A timestamp column did not hold RFC 3339 text.
    #[error("invalid timestamp `{value}` in `{path}`")]
    InvalidTimestamp {
        path: String,
        value: String,
        #[source]
        source: time::error::Parse,
    },
    /// A write that returns its representation came back without exactly one row.
    #[error("expected one row from `{path}`, got {count}")]
    UnexpectedRowCount { path: String, count: usize },
}

impl PostgrestDaoError {
    fn unique_violation_column(&self) -> Option<&'static str> {
        match self {
            PostgrestDaoError::RequestStatus { body, .. }
                if body.code.as_deref() == Some(UNIQUE_VIOLATION_CODE)
                    && body.mentions(JOIN_CODE_COLUMN) =>
            {
                Some(JOIN_CODE_COLUMN)
            }
            _ => None,
        }
    }
}

impl From<PostgrestDaoError> for StorageError {
    fn from(err: PostgrestDaoError) -> Self {
        if let Some(column) = err.unique_violation_column() {
            return StorageError::unique_violation(column);
        }
        match err {
            PostgrestDaoError::RequestStatus { .. }
            | PostgrestDaoError::UnexpectedRowCount { .. } => StorageError::rejected(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
