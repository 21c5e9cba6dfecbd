//! Append-only question ledger scoped to a session, read back in ranked order.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        models::{NewQuestion, QuestionEntity},
        qa_store::QaStore,
    },
    error::ServiceError,
    services::session_registry::{ResolvedSession, SessionRegistry},
};

/// Ranked questions together with the session they were resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLedger {
    pub session: ResolvedSession,
    pub questions: Vec<QuestionEntity>,
}

#[derive(Clone)]
pub struct QuestionLedger {
    store: Arc<dyn QaStore>,
    registry: SessionRegistry,
}

impl QuestionLedger {
    pub fn new(store: Arc<dyn QaStore>, registry: SessionRegistry) -> Self {
        Self { store, registry }
    }

    /// Append a question with zero votes.
    ///
    /// A nil session id or blank text fails with `InvalidArgument` before any
    /// backend call. The stored text is trimmed.
    pub async fn submit(
        &self,
        session_id: Uuid,
        text: &str,
    ) -> Result<QuestionEntity, ServiceError> {
        if session_id.is_nil() {
            return Err(ServiceError::InvalidArgument(
                "session id is required".into(),
            ));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "question text is required".into(),
            ));
        }

        let question = self
            .store
            .insert_question(NewQuestion {
                session_id,
                text: text.to_string(),
            })
            .await
            .map_err(ServiceError::Backend)?;

        info!(%session_id, question_id = %question.id, "question submitted");
        Ok(question)
    }

    /// Every question of the session, most votes first and oldest first among equals.
    pub async fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<QuestionEntity>, ServiceError> {
        let mut questions = self
            .store
            .query_questions(session_id)
            .await
            .map_err(ServiceError::Backend)?;

        // Stable, so rows the backend already ordered keep their relative order.
        if !questions.is_sorted_by(|a, b| a.rank_cmp(b).is_le()) {
            debug!(%session_id, "backend returned questions out of rank order; re-sorting");
            questions.sort_by(QuestionEntity::rank_cmp);
        }

        Ok(questions)
    }

    /// Resolve `join_code` and list its questions. A failed resolution fails the
    /// whole call; questions are never queried without a session.
    pub async fn list_by_join_code(&self, join_code: &str) -> Result<SessionLedger, ServiceError> {
        let session = self.registry.resolve_join_code(join_code).await?;
        let questions = self.list_by_session(session.session.id).await?;
        Ok(SessionLedger { session, questions })
    }
}
