use serde::Serialize;
use tracing::warn;

use crate::{
    dao::models::QuestionChange,
    dto::sse::{Handshake, QuestionInsertedEvent, ServerEvent, VotesChangedEvent},
};

const EVENT_HANDSHAKE: &str = "session.joined";
const EVENT_QUESTION_INSERTED: &str = "question.inserted";
const EVENT_QUESTION_VOTES: &str = "question.votes";

/// First event of every session stream.
pub fn handshake_event(handshake: &Handshake) -> Option<ServerEvent> {
    to_event(EVENT_HANDSHAKE, handshake)
}

/// Translate a store change into the SSE event pushed to viewers.
pub fn change_event(change: QuestionChange) -> Option<ServerEvent> {
    match change {
        QuestionChange::Inserted(question) => to_event(
            EVENT_QUESTION_INSERTED,
            &QuestionInsertedEvent {
                question: question.into(),
            },
        ),
        QuestionChange::VotesChanged {
            question_id, votes, ..
        } => to_event(
            EVENT_QUESTION_VOTES,
            &VotesChangedEvent { question_id, votes },
        ),
    }
}

fn to_event(event: &str, payload: &impl Serialize) -> Option<ServerEvent> {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event, error = %err, "failed to serialize SSE payload");
            None
        }
    }
}
