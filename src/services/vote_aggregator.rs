//! Vote counting with an atomic primary path and a degraded fallback.
//!
//! The fallback reads the counter and writes back `votes + delta`. Two voters
//! racing through it can both read the same value, so one vote is lost. It only
//! runs when the backend's atomic increment is unreachable.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::QuestionEntity,
        qa_store::QaStore,
        storage::{StorageError, StorageResult},
    },
    error::ServiceError,
};

/// Which path recorded the vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePath {
    /// Backend-side indivisible increment.
    Atomic,
    /// Client-side read-modify-write; concurrent votes may be lost.
    ReadModifyWrite,
}

/// Vote count after a vote was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteOutcome {
    pub question_id: Uuid,
    pub votes: u32,
    pub path: VotePath,
}

#[derive(Clone)]
pub struct VoteAggregator {
    store: Arc<dyn QaStore>,
}

impl VoteAggregator {
    pub fn new(store: Arc<dyn QaStore>) -> Self {
        Self { store }
    }

    /// Add `delta` votes to a question.
    pub async fn increment_vote(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> Result<VoteOutcome, ServiceError> {
        if delta == 0 {
            return Err(ServiceError::InvalidArgument(
                "vote delta must be at least 1".into(),
            ));
        }

        let atomic_err = match self.store.atomic_increment_vote(question_id, delta).await {
            Ok(votes) => {
                debug!(%question_id, votes, "vote recorded atomically");
                return Ok(VoteOutcome {
                    question_id,
                    votes,
                    path: VotePath::Atomic,
                });
            }
            Err(err) => err,
        };

        warn!(
            %question_id,
            error = %atomic_err,
            "atomic vote increment failed; falling back to read-modify-write (concurrent votes may be lost)"
        );

        match self.read_modify_write(question_id, delta).await {
            Ok(question) => Ok(VoteOutcome {
                question_id,
                votes: question.votes,
                path: VotePath::ReadModifyWrite,
            }),
            Err(fallback_err) => {
                warn!(%question_id, error = %fallback_err, "fallback vote path failed");
                Err(ServiceError::VoteFailed {
                    question_id,
                    atomic: atomic_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    async fn read_modify_write(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> StorageResult<QuestionEntity> {
        let current = self
            .store
            .find_question(question_id)
            .await?
            .ok_or_else(|| StorageError::rejected(format!("question `{question_id}` not found")))?;

        let votes = current
            .votes
            .checked_add(delta)
            .ok_or_else(|| StorageError::rejected("vote counter overflow"))?;

        self.store.update_question_votes(question_id, votes).await
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;

    use super::*;
    use crate::dao::{models::NewQuestion, qa_store::fake::FakeStore};

    async fn seeded_question(store: &FakeStore) -> QuestionEntity {
        let session = store.memory().insert_session("54321".into()).await.unwrap();
        store
            .memory()
            .insert_question(NewQuestion {
                session_id: session.id,
                text: "What is a computer?".into(),
            })
            .await
            .unwrap()
    }

    fn aggregator(store: &FakeStore) -> VoteAggregator {
        VoteAggregator::new(Arc::new(store.clone()))
    }

    #[tokio::test]
    async fn atomic_path_counts_votes() {
        let store = FakeStore::new();
        let question = seeded_question(&store).await;

        let outcome = aggregator(&store)
            .increment_vote(question.id, 1)
            .await
            .unwrap();

        assert_eq!(outcome.votes, 1);
        assert_eq!(outcome.path, VotePath::Atomic);
        assert_eq!(store.calls("find_question"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_atomic_votes_are_never_lost() {
        let store = FakeStore::new();
        let question = seeded_question(&store).await;
        let aggregator = aggregator(&store);

        let votes = (0..50).map(|_| {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.increment_vote(question.id, 1).await })
        });
        for result in join_all(votes).await {
            result.unwrap().unwrap();
        }

        let stored = store.memory().find_question(question.id).await.unwrap().unwrap();
        assert_eq!(stored.votes, 50);
    }

    #[tokio::test]
    async fn fallback_used_when_atomic_path_fails() {
        let store = FakeStore::new();
        let question = seeded_question(&store).await;
        store.script(|script| script.fail_atomic_vote = true);

        let outcome = aggregator(&store)
            .increment_vote(question.id, 1)
            .await
            .unwrap();

        assert_eq!(outcome.votes, 1);
        assert_eq!(outcome.path, VotePath::ReadModifyWrite);
        assert_eq!(store.calls("update_question_votes"), 1);
    }

    #[tokio::test]
    async fn concurrent_fallback_votes_may_be_lost() {
        let store = FakeStore::new();
        let question = seeded_question(&store).await;
        store.script(|script| {
            script.fail_atomic_vote = true;
            script.yield_in_fallback = true;
        });
        let aggregator = aggregator(&store);

        let outcomes = join_all((0..10).map(|_| aggregator.increment_vote(question.id, 1))).await;
        assert!(outcomes.iter().all(Result::is_ok));

        let stored = store.memory().find_question(question.id).await.unwrap().unwrap();
        assert!(stored.votes >= 1);
        assert!(stored.votes <= 10);
    }

    #[tokio::test]
    async fn both_paths_failing_is_vote_failed() {
        let store = FakeStore::new();
        let question = seeded_question(&store).await;
        store.script(|script| {
            script.fail_atomic_vote = true;
            script.fail_update_votes = true;
        });

        let err = aggregator(&store)
            .increment_vote(question.id, 1)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::VoteFailed { question_id, .. } if question_id == question.id));
    }

    #[tokio::test]
    async fn unknown_question_is_vote_failed() {
        let store = FakeStore::new();
        let err = aggregator(&store)
            .increment_vote(Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::VoteFailed { .. }));
    }

    #[tokio::test]
    async fn zero_delta_is_rejected_locally() {
        let store = FakeStore::new();
        let err = aggregator(&store)
            .increment_vote(Uuid::new_v4(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidArgument(_)));
        assert_eq!(store.total_calls(), 0);
    }
}
