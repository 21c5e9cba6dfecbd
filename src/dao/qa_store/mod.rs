#[cfg(test)]
pub mod fake;
mod feed;
pub mod memory;
#[cfg(feature = "postgrest-store")]
pub mod postgrest;

use crate::dao::models::{NewQuestion, QuestionEntity, SessionEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

pub use self::feed::{ChangeFeed, Subscription};

/// Abstraction over the persistence backend holding sessions and questions.
///
/// Implementations own uniqueness of `join_code` and the atomicity of
/// [`QaStore::atomic_increment_vote`]; callers never lock around them.
pub trait QaStore: Send + Sync {
    /// Insert a session; a taken code fails with a `join_code` unique violation.
    fn insert_session(&self, join_code: String) -> BoxFuture<'static, StorageResult<SessionEntity>>;
    /// Every session carrying `join_code`. Zero or one row is expected.
    fn query_sessions_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;
    /// Append a question with zero votes.
    fn insert_question(&self, question: NewQuestion)
    -> BoxFuture<'static, StorageResult<QuestionEntity>>;
    /// Questions of a session ordered by votes descending, then creation ascending.
    fn query_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;
    /// Single question lookup used by the read-modify-write vote path.
    fn find_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;
    /// Indivisible `votes = votes + delta` executed by the backend, returning the new count.
    fn atomic_increment_vote(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> BoxFuture<'static, StorageResult<u32>>;
    /// Unconditional overwrite of the vote counter.
    fn update_question_votes(
        &self,
        question_id: Uuid,
        votes: u32,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>>;
    /// Best-effort change notifications for one session.
    fn subscribe(&self, session_id: Uuid) -> Subscription;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
