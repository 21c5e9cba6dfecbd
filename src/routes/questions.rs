use axum::{Json, Router, extract::State, routing::post};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        envelope::Envelope,
        question::{QuestionResponse, SubmitQuestionRequest, VoteRequest, VoteResponse},
    },
    error::AppError,
    routes::extract::{ApiJson, ApiPath},
    state::SharedState,
};

/// Routes submitting and voting on questions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/questions", post(submit_question))
        .route("/questions/{question_id}/votes", post(vote))
}

/// Append a question to a session.
#[utoipa::path(
    post,
    path = "/questions",
    tag = "questions",
    request_body = SubmitQuestionRequest,
    responses(
        (status = 200, description = "Question stored", body = Envelope<QuestionResponse>),
        (status = 400, description = "Missing session or blank text")
    )
)]
pub async fn submit_question(
    State(state): State<SharedState>,
    ApiJson(payload): ApiJson<SubmitQuestionRequest>,
) -> Result<Json<Envelope<QuestionResponse>>, AppError> {
    // A missing id takes the same path as a nil one so the ledger rejects it.
    let session_id = payload.session_id.unwrap_or_else(Uuid::nil);
    let question = state
        .core()
        .await?
        .ledger()
        .submit(session_id, &payload.text)
        .await?;
    Ok(Json(Envelope::ok(question.into())))
}

/// Add votes to a question.
#[utoipa::path(
    post,
    path = "/questions/{question_id}/votes",
    tag = "questions",
    params(("question_id" = Uuid, Path, description = "Question identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = Envelope<VoteResponse>),
        (status = 400, description = "Delta below one"),
        (status = 502, description = "Both vote paths failed")
    )
)]
pub async fn vote(
    State(state): State<SharedState>,
    ApiPath(question_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<VoteRequest>,
) -> Result<Json<Envelope<VoteResponse>>, AppError> {
    payload.validate()?;
    let outcome = state
        .core()
        .await?
        .votes()
        .increment_vote(question_id, payload.delta())
        .await?;
    Ok(Json(Envelope::ok(outcome.into())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::*;
    use crate::{
        config::AppConfig, dao::qa_store::memory::MemoryQaStore, dto::envelope::ErrorKind,
        state::AppState,
    };

    async fn state_with_session() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        state.install_store(Arc::new(MemoryQaStore::new(16))).await;
        let session = state
            .core()
            .await
            .unwrap()
            .registry()
            .create_session()
            .await
            .unwrap();
        (state, session.id)
    }

    fn submission(session_id: Option<Uuid>, text: &str) -> ApiJson<SubmitQuestionRequest> {
        ApiJson(SubmitQuestionRequest {
            session_id,
            text: text.into(),
        })
    }

    #[tokio::test]
    async fn submitted_question_can_be_voted() {
        let (state, session_id) = state_with_session().await;

        let Json(submitted) = submit_question(
            State(state.clone()),
            submission(Some(session_id), " What is a computer? "),
        )
        .await
        .unwrap();
        let question = submitted.data.unwrap();
        assert_eq!(question.text, "What is a computer?");
        assert_eq!(question.votes, 0);

        let Json(voted) = vote(
            State(state),
            ApiPath(question.id),
            ApiJson(VoteRequest { delta: Some(2) }),
        )
        .await
        .unwrap();
        assert_eq!(voted.data.unwrap().votes, 2);
    }

    #[tokio::test]
    async fn missing_session_id_is_invalid() {
        let (state, _) = state_with_session().await;

        let err = submit_question(State(state), submission(None, "Why?"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_delta_is_invalid() {
        let (state, _) = state_with_session().await;

        let err = vote(
            State(state),
            ApiPath(Uuid::new_v4()),
            ApiJson(VoteRequest { delta: Some(0) }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn vote_on_unknown_question_fails_both_paths() {
        let (state, _) = state_with_session().await;

        let err = vote(State(state), ApiPath(Uuid::new_v4()), ApiJson(VoteRequest::default()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::VoteFailed);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
