use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::question::QuestionResponse;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// First event sent to a subscriber, naming the session it is bound to.
pub struct Handshake {
    pub session_id: Uuid,
    pub join_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a question is appended to the session.
pub struct QuestionInsertedEvent {
    pub question: QuestionResponse,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the vote count of a question moves.
pub struct VotesChangedEvent {
    pub question_id: Uuid,
    pub votes: u32,
}
