use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use super::error::PostgrestDaoError;
use crate::dao::models::{QuestionEntity, SessionEntity};

pub const SESSIONS_PATH: &str = "sessions";
pub const QUESTIONS_PATH: &str = "questions";
pub const UPDATE_VOTE_PATH: &str = "rpc/update_vote";

/// Row of the `sessions` table as returned by PostgREST.
#[derive(Debug, Deserialize)]
pub struct SessionRow {
    pub id: Uuid,
    pub join_code: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct NewSessionRow<'a> {
    pub join_code: &'a str,
}

/// Row of the `questions` table as returned by PostgREST.
#[derive(Debug, Deserialize)]
pub struct QuestionRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub text: String,
    pub votes: u32,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct NewQuestionRow<'a> {
    pub session_id: Uuid,
    pub text: &'a str,
    pub votes: u32,
}

#[derive(Debug, Serialize)]
pub struct VotesPatch {
    pub votes: u32,
}

/// Arguments of the `update_vote(question_id, worth)` database function.
#[derive(Debug, Serialize)]
pub struct UpdateVoteArgs {
    pub question_id: Uuid,
    pub worth: u32,
}

/// Error document PostgREST sends alongside non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl ApiErrorBody {
    /// Whether the message or details name `needle` (e.g. a column or constraint).
    pub fn mentions(&self, needle: &str) -> bool {
        [&self.message, &self.details]
            .into_iter()
            .flatten()
            .any(|text| text.contains(needle))
    }

    pub fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "no error body".into(),
        }
    }
}

impl SessionRow {
    pub fn try_into_entity(self, path: &str) -> Result<SessionEntity, PostgrestDaoError> {
        Ok(SessionEntity {
            created_at: parse_timestamp(path, &self.created_at)?,
            id: self.id,
            join_code: self.join_code,
        })
    }
}

impl QuestionRow {
    pub fn try_into_entity(self, path: &str) -> Result<QuestionEntity, PostgrestDaoError> {
        Ok(QuestionEntity {
            created_at: parse_timestamp(path, &self.created_at)?,
            id: self.id,
            session_id: self.session_id,
            text: self.text,
            votes: self.votes,
        })
    }
}

/// Parse a `timestamptz` rendered by PostgREST.
pub fn parse_timestamp(path: &str, value: &str) -> Result<SystemTime, PostgrestDaoError> {
    OffsetDateTime::parse(value, &Rfc3339)
        .map(SystemTime::from)
        .map_err(|source| PostgrestDaoError::InvalidTimestamp {
            path: path.to_string(),
            value: value.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_postgres_timestamps() {
        let parsed = parse_timestamp("sessions", "1970-01-01T00:00:01.5+00:00").unwrap();
        assert_eq!(parsed, SystemTime::UNIX_EPOCH + Duration::from_millis(1_500));
    }

    #[test]
    fn rejects_garbage_timestamps() {
        let err = parse_timestamp("sessions", "yesterday").unwrap_err();
        assert!(matches!(err, PostgrestDaoError::InvalidTimestamp { .. }));
    }

    #[test]
    fn question_rows_become_entities() {
        let row: QuestionRow = serde_json::from_value(serde_json::json!({
            "id": "7b0c2c8e-5a43-4a9e-9a3a-1d1f0f7f6f10",
            "session_id": "0f3c8c52-3f0a-4c8f-8d9b-6e5b8e7f0a11",
            "text": "What is a computer?",
            "votes": 3,
            "created_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap();
        let entity = row.try_into_entity("questions").unwrap();
        assert_eq!(entity.votes, 3);
        assert_eq!(entity.text, "What is a computer?");
    }

    #[test]
    fn negative_votes_do_not_deserialize() {
        let row = serde_json::from_value::<QuestionRow>(serde_json::json!({
            "id": "7b0c2c8e-5a43-4a9e-9a3a-1d1f0f7f6f10",
            "session_id": "0f3c8c52-3f0a-4c8f-8d9b-6e5b8e7f0a11",
            "text": "x",
            "votes": -1,
            "created_at": "2024-05-01T12:00:00Z"
        }));
        assert!(row.is_err());
    }

    #[test]
    fn error_body_mentions_constraint() {
        let body = ApiErrorBody {
            code: Some("23505".into()),
            message: None,
            details: Some("Key (join_code)=(54321) already exists.".into()),
            hint: None,
        };
        assert!(body.mentions("join_code"));
        assert_eq!(body.describe(), "23505");
    }
}
