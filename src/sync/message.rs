use std::time::SystemTime;

use uuid::Uuid;

use crate::dao::models::QuestionEntity;

/// Persistence state of a locally shown message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Optimistic echo, persistence still in flight.
    Pending,
    /// Read back from, or acknowledged by, the backend.
    Confirmed,
    /// The backend refused or never received it. The echo stays visible until
    /// the next successful reload.
    Failed,
}

/// Client-side projection of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Question id once known, otherwise a local id.
    pub id: Uuid,
    pub text: String,
    pub ts: SystemTime,
    pub votes: u32,
    pub status: MessageStatus,
}

impl Message {
    pub(crate) fn pending(text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.to_string(),
            ts: SystemTime::now(),
            votes: 0,
            status: MessageStatus::Pending,
        }
    }

    pub(crate) fn confirm(&mut self, question: &QuestionEntity) {
        self.id = question.id;
        self.ts = question.created_at;
        self.votes = question.votes;
        self.status = MessageStatus::Confirmed;
    }
}

impl From<QuestionEntity> for Message {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            text: question.text,
            ts: question.created_at,
            votes: question.votes,
            status: MessageStatus::Confirmed,
        }
    }
}
