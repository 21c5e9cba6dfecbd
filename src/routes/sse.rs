use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    routes::extract::ApiPath,
    services::{sse_events, sse_service},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/sessions/{join_code}",
    tag = "sse",
    params(("join_code" = String, Path, description = "Five digit join code")),
    responses(
        (status = 200, description = "Change stream of one session", content_type = "text/event-stream", body = String),
        (status = 404, description = "No session uses this join code")
    )
)]
/// Stream question and vote changes of one session.
///
/// Delivery is best effort; viewers should reload the ledger on any event and keep polling.
pub async fn session_stream(
    State(state): State<SharedState>,
    ApiPath(join_code): ApiPath<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let core = state.core().await?;
    let stream = sse_service::subscribe_session(&state, &core, &join_code).await?;
    let session_id = stream.handshake.session_id;
    info!(%session_id, %join_code, "new session SSE connection");

    Ok(sse_service::to_sse_stream(
        stream.receiver,
        session_id,
        sse_events::handshake_event(&stream.handshake),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/sessions/{join_code}", get(session_stream))
}
