use std::{cmp::Ordering, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Q&A room persisted by the storage layer. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Backend-assigned identifier.
    pub id: Uuid,
    /// Five digit public code participants use to find the session.
    pub join_code: String,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

/// Question submitted to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Backend-assigned identifier.
    pub id: Uuid,
    /// Owning session, fixed for the lifetime of the question.
    pub session_id: Uuid,
    /// Trimmed, non-empty question text.
    pub text: String,
    /// Aggregated vote count; only the vote aggregator changes it.
    pub votes: u32,
    /// Submission timestamp, used to break ties between equal vote counts.
    pub created_at: SystemTime,
}

impl QuestionEntity {
    /// Ranking order shown to participants: most votes first, then oldest first.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .votes
            .cmp(&self.votes)
            .then_with(|| self.created_at.cmp(&other.created_at))
    }
}

/// Insert payload for a new question; the backend assigns id and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewQuestion {
    pub session_id: Uuid,
    pub text: String,
}

/// Change notification published by a store for a single session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionChange {
    /// A question was appended to the ledger.
    Inserted(QuestionEntity),
    /// The vote counter of a question moved.
    VotesChanged {
        question_id: Uuid,
        session_id: Uuid,
        votes: u32,
    },
}

impl QuestionChange {
    /// Session the change belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            QuestionChange::Inserted(question) => question.session_id,
            QuestionChange::VotesChanged { session_id, .. } => *session_id,
        }
    }
}
