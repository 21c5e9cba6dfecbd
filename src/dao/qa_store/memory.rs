//! In-process store used when no remote backend is configured, and by tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::SystemTime,
};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use super::{ChangeFeed, QaStore, Subscription};
use crate::dao::{
    models::{NewQuestion, QuestionChange, QuestionEntity, SessionEntity},
    storage::{StorageError, StorageResult},
};

const JOIN_CODE_COLUMN: &str = "join_code";

#[derive(Clone)]
pub struct MemoryQaStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    /// Unique index on `join_code`.
    sessions: DashMap<String, SessionEntity>,
    questions: DashMap<Uuid, StoredQuestion>,
    sequence: AtomicU64,
    feed: ChangeFeed,
}

struct StoredQuestion {
    /// Insertion order, keeps ties on identical timestamps stable.
    seq: u64,
    question: QuestionEntity,
}

impl MemoryQaStore {
    /// Create an empty store whose change feed buffers `feed_capacity` events.
    pub fn new(feed_capacity: usize) -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                sessions: DashMap::new(),
                questions: DashMap::new(),
                sequence: AtomicU64::new(0),
                feed: ChangeFeed::new(feed_capacity),
            }),
        }
    }
}

impl MemoryInner {
    fn insert_session(&self, join_code: String) -> StorageResult<SessionEntity> {
        match self.sessions.entry(join_code.clone()) {
            Entry::Occupied(_) => Err(StorageError::unique_violation(JOIN_CODE_COLUMN)),
            Entry::Vacant(slot) => {
                let session = SessionEntity {
                    id: Uuid::new_v4(),
                    join_code,
                    created_at: SystemTime::now(),
                };
                slot.insert(session.clone());
                Ok(session)
            }
        }
    }

    fn insert_question(&self, new: NewQuestion) -> StorageResult<QuestionEntity> {
        let session_known = self
            .sessions
            .iter()
            .any(|entry| entry.value().id == new.session_id);
        if !session_known {
            return Err(StorageError::rejected(format!(
                "session `{}` does not exist",
                new.session_id
            )));
        }

        let question = QuestionEntity {
            id: Uuid::new_v4(),
            session_id: new.session_id,
            text: new.text,
            votes: 0,
            created_at: SystemTime::now(),
        };
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        self.questions.insert(
            question.id,
            StoredQuestion {
                seq,
                question: question.clone(),
            },
        );
        self.feed
            .publish(QuestionChange::Inserted(question.clone()));
        Ok(question)
    }

    fn query_questions(&self, session_id: Uuid) -> Vec<QuestionEntity> {
        let mut rows = self
            .questions
            .iter()
            .filter(|entry| entry.value().question.session_id == session_id)
            .map(|entry| (entry.value().seq, entry.value().question.clone()))
            .collect::<Vec<_>>();
        rows.sort_by(|(seq_a, a), (seq_b, b)| a.rank_cmp(b).then(seq_a.cmp(seq_b)));
        rows.into_iter().map(|(_, question)| question).collect()
    }

    fn set_votes<F>(&self, question_id: Uuid, next: F) -> StorageResult<QuestionEntity>
    where
        F: FnOnce(u32) -> StorageResult<u32>,
    {
        // The shard write lock is held across read and write, making this indivisible.
        let updated = {
            let mut entry = self
                .questions
                .get_mut(&question_id)
                .ok_or_else(|| StorageError::rejected(format!("question `{question_id}` not found")))?;
            entry.question.votes = next(entry.question.votes)?;
            entry.question.clone()
        };

        self.feed.publish(QuestionChange::VotesChanged {
            question_id,
            session_id: updated.session_id,
            votes: updated.votes,
        });
        Ok(updated)
    }
}

impl QaStore for MemoryQaStore {
    fn insert_session(&self, join_code: String) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert_session(join_code) })
    }

    fn query_sessions_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .sessions
                .get(&join_code)
                .map(|entry| vec![entry.value().clone()])
                .unwrap_or_default())
        })
    }

    fn insert_question(
        &self,
        question: NewQuestion,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.insert_question(question) })
    }

    fn query_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.query_questions(session_id)) })
    }

    fn find_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .questions
                .get(&question_id)
                .map(|entry| entry.value().question.clone()))
        })
    }

    fn atomic_increment_vote(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        let store = self.clone();
        Box::pin(async move {
            let updated = store.inner.set_votes(question_id, |votes| {
                votes
                    .checked_add(delta)
                    .ok_or_else(|| StorageError::rejected("vote counter overflow"))
            })?;
            Ok(updated.votes)
        })
    }

    fn update_question_votes(
        &self,
        question_id: Uuid,
        votes: u32,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.inner.set_votes(question_id, |_| Ok(votes)) })
    }

    fn subscribe(&self, session_id: Uuid) -> Subscription {
        self.inner.feed.subscribe(session_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_join_code_is_a_unique_violation() {
        let store = MemoryQaStore::new(8);
        store.insert_session("54321".into()).await.unwrap();

        let err = store.insert_session("54321".into()).await.unwrap_err();
        assert!(err.is_unique_violation_on("join_code"));
        assert_eq!(
            store
                .query_sessions_by_join_code("54321".into())
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn questions_require_an_existing_session() {
        let store = MemoryQaStore::new(8);
        let err = store
            .insert_question(NewQuestion {
                session_id: Uuid::new_v4(),
                text: "orphan".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
    }

    #[tokio::test]
    async fn query_orders_by_votes_then_insertion() {
        let store = MemoryQaStore::new(8);
        let session = store.insert_session("11111".into()).await.unwrap();
        let mut ids = Vec::new();
        for text in ["first", "second", "third"] {
            let question = store
                .insert_question(NewQuestion {
                    session_id: session.id,
                    text: text.into(),
                })
                .await
                .unwrap();
            ids.push(question.id);
        }
        store.atomic_increment_vote(ids[2], 2).await.unwrap();

        let texts = store
            .query_questions(session.id)
            .await
            .unwrap()
            .into_iter()
            .map(|question| question.text)
            .collect::<Vec<_>>();
        assert_eq!(texts, ["third", "first", "second"]);
    }

    #[tokio::test]
    async fn vote_changes_are_published() {
        let store = MemoryQaStore::new(8);
        let session = store.insert_session("22222".into()).await.unwrap();
        let question = store
            .insert_question(NewQuestion {
                session_id: session.id,
                text: "hello".into(),
            })
            .await
            .unwrap();
        let mut subscription = store.subscribe(session.id);

        assert_eq!(store.atomic_increment_vote(question.id, 1).await.unwrap(), 1);
        assert_eq!(
            subscription.next().await,
            Some(QuestionChange::VotesChanged {
                question_id: question.id,
                session_id: session.id,
                votes: 1,
            })
        );
    }

    #[tokio::test]
    async fn incrementing_unknown_question_is_rejected() {
        let store = MemoryQaStore::new(8);
        let err = store
            .atomic_increment_vote(Uuid::new_v4(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected { .. }));
    }
}
