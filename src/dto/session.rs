use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dao::models::SessionEntity, dto::format_system_time, services::session_registry::ResolvedSession};

/// Session as exposed to hosts and participants.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub join_code: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Set when the join code matched more than one session and the first was picked.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub inconsistent: bool,
}

impl From<SessionEntity> for SessionResponse {
    fn from(session: SessionEntity) -> Self {
        Self {
            id: session.id,
            join_code: session.join_code,
            created_at: format_system_time(session.created_at),
            inconsistent: false,
        }
    }
}

impl From<ResolvedSession> for SessionResponse {
    fn from(resolved: ResolvedSession) -> Self {
        let inconsistent = resolved.is_inconsistent();
        Self {
            inconsistent,
            ..resolved.session.into()
        }
    }
}
