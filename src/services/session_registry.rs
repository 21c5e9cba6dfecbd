//! Join code allocation and resolution.

use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::{
    dao::{models::SessionEntity, qa_store::QaStore},
    dto::validation::{JOIN_CODE_OUT_OF_RANGE, validate_join_code},
    error::ServiceError,
};

/// Smallest join code handed out.
pub const JOIN_CODE_MIN: u32 = 10_000;
/// Largest join code handed out.
pub const JOIN_CODE_MAX: u32 = 99_999;
/// Default bound on insert attempts before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

const JOIN_CODE_COLUMN: &str = "join_code";

/// Session returned by a join code lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session: SessionEntity,
    /// Rows sharing the join code besides the returned one. Anything but zero
    /// means the backend's uniqueness guarantee is broken.
    pub duplicates: usize,
}

impl ResolvedSession {
    pub fn is_inconsistent(&self) -> bool {
        self.duplicates > 0
    }
}

/// Creates sessions with unique join codes and resolves codes back to sessions.
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn QaStore>,
    max_attempts: u32,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn QaStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the attempt bound (at least one attempt is always made).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Allocate a session under a freshly generated join code.
    pub async fn create_session(&self) -> Result<SessionEntity, ServiceError> {
        self.create_session_with(generate_join_code).await
    }

    /// Allocate a session, drawing candidate codes from `next_code`.
    ///
    /// Only a uniqueness violation on `join_code` triggers another attempt; any
    /// other failure aborts immediately.
    pub(crate) async fn create_session_with<F>(
        &self,
        mut next_code: F,
    ) -> Result<SessionEntity, ServiceError>
    where
        F: FnMut() -> String,
    {
        for attempt in 1..=self.max_attempts {
            let join_code = next_code();
            debug!(attempt, %join_code, "trying join code");

            match self.store.insert_session(join_code.clone()).await {
                Ok(session) => {
                    info!(session_id = %session.id, %join_code, attempt, "session created");
                    return Ok(session);
                }
                Err(err) if err.is_unique_violation_on(JOIN_CODE_COLUMN) => {
                    debug!(attempt, %join_code, "join code already taken; regenerating");
                }
                Err(err) => {
                    warn!(attempt, error = %err, "session creation failed");
                    return Err(ServiceError::Backend(err));
                }
            }
        }

        warn!(
            attempts = self.max_attempts,
            "could not allocate a unique join code"
        );
        Err(ServiceError::ExhaustedRetries {
            attempts: self.max_attempts,
        })
    }

    /// Look up the session a join code belongs to.
    ///
    /// A malformed code fails with `InvalidArgument` without touching the
    /// backend. A five digit code with a leading zero is never allocated and is
    /// `NotFound`, also without a backend call. Zero rows is `NotFound`. More than one row breaks the uniqueness
    /// invariant: the first row is returned so the session stays reachable, the
    /// violation is logged and flagged on the result.
    pub async fn resolve_join_code(&self, join_code: &str) -> Result<ResolvedSession, ServiceError> {
        validate_join_code(join_code).map_err(|err| {
            if err.code == JOIN_CODE_OUT_OF_RANGE {
                return not_found(join_code);
            }
            ServiceError::InvalidArgument(
                err.message
                    .map(|message| message.into_owned())
                    .unwrap_or_else(|| format!("invalid join code `{join_code}`")),
            )
        })?;

        let mut rows = self
            .store
            .query_sessions_by_join_code(join_code.to_string())
            .await
            .map_err(ServiceError::Backend)?;

        if rows.is_empty() {
            return Err(not_found(join_code));
        }

        let duplicates = rows.len() - 1;
        if duplicates > 0 {
            error!(
                %join_code,
                rows = rows.len(),
                "join code matches several sessions; uniqueness invariant violated, using the first"
            );
        }

        Ok(ResolvedSession {
            session: rows.swap_remove(0),
            duplicates,
        })
    }
}

fn not_found(join_code: &str) -> ServiceError {
    ServiceError::NotFound(format!("session not found for join code `{join_code}`"))
}

/// Draw a join code uniformly from `JOIN_CODE_MIN..=JOIN_CODE_MAX`.
pub fn generate_join_code() -> String {
    rand::rng()
        .random_range(JOIN_CODE_MIN..=JOIN_CODE_MAX)
        .to_string()
}
