use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    dto::envelope::{Envelope, ErrorKind},
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad local input; the backend was never called.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A join code resolved to zero sessions.
    #[error("not found: {0}")]
    NotFound(String),
    /// Session creation gave up after colliding on every generated join code.
    #[error("no unique join code found after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },
    /// Any other backend failure, passed through opaquely.
    #[error("backend error: {0}")]
    Backend(#[source] StorageError),
    /// Both the atomic and the read-modify-write vote paths failed.
    #[error("vote on question `{question_id}` failed (atomic: {atomic}; fallback: {fallback})")]
    VoteFailed {
        question_id: Uuid,
        atomic: String,
        fallback: String,
    },
    /// No storage backend is installed.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::InvalidArgument(format!("validation failed: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request rejected before reaching the backend.
    #[error("{0}")]
    InvalidArgument(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Join code allocation gave up.
    #[error("{0}")]
    ExhaustedRetries(String),
    /// Backend reported a failure.
    #[error("{0}")]
    Backend(String),
    /// Vote could not be recorded on either path.
    #[error("{0}")]
    VoteFailed(String),
    /// Service unavailable or degraded.
    #[error("{0}")]
    ServiceUnavailable(String),
}

impl AppError {
    /// Machine-readable kind carried in the error envelope.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::ExhaustedRetries(_) => ErrorKind::ExhaustedRetries,
            AppError::Backend(_) => ErrorKind::BackendError,
            AppError::VoteFailed(_) => ErrorKind::VoteFailed,
            AppError::ServiceUnavailable(_) => ErrorKind::Unavailable,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ExhaustedRetries(_) => StatusCode::CONFLICT,
            AppError::Backend(_) | AppError::VoteFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::InvalidArgument(_) => AppError::InvalidArgument(message),
            ServiceError::NotFound(_) => AppError::NotFound(message),
            ServiceError::ExhaustedRetries { .. } => AppError::ExhaustedRetries(message),
            ServiceError::Backend(_) => AppError::Backend(message),
            ServiceError::VoteFailed { .. } => AppError::VoteFailed(message),
            ServiceError::Degraded => AppError::ServiceUnavailable(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let payload = Json(Envelope::<()>::failure(self.kind(), self.to_string()));
        (status, payload).into_response()
    }
}
