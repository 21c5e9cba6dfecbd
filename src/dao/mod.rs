/// Database model definitions.
pub mod models;
/// Persistence backends for sessions and questions.
pub mod qa_store;
/// Storage abstraction layer for database operations.
pub mod storage;
