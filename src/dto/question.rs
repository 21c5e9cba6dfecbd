use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::QuestionEntity,
    dto::{format_system_time, session::SessionResponse},
    services::{question_ledger::SessionLedger, vote_aggregator::VoteOutcome},
};

/// Question as shown in the ranked list.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: Uuid,
    pub session_id: Uuid,
    pub text: String,
    pub votes: u32,
    /// RFC 3339 submission timestamp.
    pub created_at: String,
}

impl From<QuestionEntity> for QuestionResponse {
    fn from(question: QuestionEntity) -> Self {
        Self {
            id: question.id,
            session_id: question.session_id,
            text: question.text,
            votes: question.votes,
            created_at: format_system_time(question.created_at),
        }
    }
}

/// Ranked questions of a session looked up by id.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionsResponse {
    pub session_id: Uuid,
    pub questions: Vec<QuestionResponse>,
}

/// Ranked questions of a session looked up by join code, with the session itself.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionQuestionsResponse {
    pub session: SessionResponse,
    pub questions: Vec<QuestionResponse>,
}

impl From<SessionLedger> for SessionQuestionsResponse {
    fn from(ledger: SessionLedger) -> Self {
        Self {
            session: ledger.session.into(),
            questions: ledger.questions.into_iter().map(Into::into).collect(),
        }
    }
}

/// Payload submitting a question. Both fields are checked by the ledger so a
/// missing value yields the same `invalid_argument` error as an empty one.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitQuestionRequest {
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub text: String,
}

/// Payload of a vote. `delta` defaults to a single vote.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    #[validate(range(min = 1, message = "delta must be at least 1"))]
    pub delta: Option<u32>,
}

impl VoteRequest {
    pub fn delta(&self) -> u32 {
        self.delta.unwrap_or(1)
    }
}

/// Vote count after a successful vote.
#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    pub question_id: Uuid,
    pub votes: u32,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            question_id: outcome.question_id,
            votes: outcome.votes,
        }
    }
}
