use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the live Q&A service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::session_stream,
        crate::routes::sessions::create_session,
        crate::routes::sessions::resolve_session,
        crate::routes::sessions::list_by_join_code,
        crate::routes::sessions::list_by_session,
        crate::routes::questions::submit_question,
        crate::routes::questions::vote,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::envelope::ErrorBody,
            crate::dto::envelope::ErrorKind,
            crate::dto::sse::Handshake,
            crate::dto::sse::QuestionInsertedEvent,
            crate::dto::sse::VotesChangedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Session creation and join code lookup"),
        (name = "questions", description = "Question submission and voting"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
