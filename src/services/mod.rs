/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Core components bundled over one store.
pub mod qa_core;
/// Append-only question ledger and ranked reads.
pub mod question_ledger;
/// Join code allocation and lookup.
pub mod session_registry;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Per-session Server-Sent Events fan-out.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Atomic vote counting with a read-modify-write fallback.
pub mod vote_aggregator;
