use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        envelope::Envelope,
        question::{QuestionsResponse, SessionQuestionsResponse},
        session::SessionResponse,
    },
    error::AppError,
    routes::extract::ApiPath,
    state::SharedState,
};

/// Routes creating and resolving sessions.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{join_code}", get(resolve_session))
        .route("/sessions/{join_code}/questions", get(list_by_join_code))
        .route(
            "/sessions/by-id/{session_id}/questions",
            get(list_by_session),
        )
}

/// Allocate a session under a fresh join code.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    responses(
        (status = 200, description = "Session created", body = Envelope<SessionResponse>),
        (status = 409, description = "No free join code found"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<Json<Envelope<SessionResponse>>, AppError> {
    let session = state.core().await?.registry().create_session().await?;
    Ok(Json(Envelope::ok(session.into())))
}

/// Resolve a join code to its session.
#[utoipa::path(
    get,
    path = "/sessions/{join_code}",
    tag = "sessions",
    params(("join_code" = String, Path, description = "Five digit join code")),
    responses(
        (status = 200, description = "Session found", body = Envelope<SessionResponse>),
        (status = 400, description = "Malformed join code"),
        (status = 404, description = "No session uses this join code")
    )
)]
pub async fn resolve_session(
    State(state): State<SharedState>,
    ApiPath(join_code): ApiPath<String>,
) -> Result<Json<Envelope<SessionResponse>>, AppError> {
    let resolved = state
        .core()
        .await?
        .registry()
        .resolve_join_code(&join_code)
        .await?;
    Ok(Json(Envelope::ok(resolved.into())))
}

/// Ranked questions of the session behind a join code.
#[utoipa::path(
    get,
    path = "/sessions/{join_code}/questions",
    tag = "sessions",
    params(("join_code" = String, Path, description = "Five digit join code")),
    responses(
        (status = 200, description = "Ranked questions", body = Envelope<SessionQuestionsResponse>),
        (status = 404, description = "No session uses this join code")
    )
)]
pub async fn list_by_join_code(
    State(state): State<SharedState>,
    ApiPath(join_code): ApiPath<String>,
) -> Result<Json<Envelope<SessionQuestionsResponse>>, AppError> {
    let ledger = state
        .core()
        .await?
        .ledger()
        .list_by_join_code(&join_code)
        .await?;
    Ok(Json(Envelope::ok(ledger.into())))
}

/// Ranked questions of a session looked up by id.
#[utoipa::path(
    get,
    path = "/sessions/by-id/{session_id}/questions",
    tag = "sessions",
    params(("session_id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Ranked questions", body = Envelope<QuestionsResponse>)
    )
)]
pub async fn list_by_session(
    State(state): State<SharedState>,
    ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Json<Envelope<QuestionsResponse>>, AppError> {
    let questions = state
        .core()
        .await?
        .ledger()
        .list_by_session(session_id)
        .await?;
    Ok(Json(Envelope::ok(QuestionsResponse {
        session_id,
        questions: questions.into_iter().map(Into::into).collect(),
    })))
}
