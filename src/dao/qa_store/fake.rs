//! Scriptable [`QaStore`] double that counts calls and injects failures.

use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use uuid::Uuid;

use super::{QaStore, Subscription, memory::MemoryQaStore};
use crate::dao::{
    models::{NewQuestion, QuestionEntity, SessionEntity},
    storage::{StorageError, StorageResult},
};

/// Failure switches consulted before delegating to the in-memory store.
#[derive(Default)]
pub struct FakeScript {
    /// Errors returned by the next `insert_session` calls, in order.
    pub session_insert_errors: VecDeque<StorageError>,
    /// Rows appended to every join-code lookup, simulating a broken unique index.
    pub extra_sessions: Vec<SessionEntity>,
    pub fail_query_sessions: bool,
    pub fail_query_questions: bool,
    pub fail_insert_question: bool,
    pub fail_atomic_vote: bool,
    pub fail_find_question: bool,
    pub fail_update_votes: bool,
    /// Yield to the scheduler between the read and the write of the fallback path.
    pub yield_in_fallback: bool,
    pub fail_health_check: bool,
}

#[derive(Clone)]
pub struct FakeStore {
    inner: Arc<FakeInner>,
}

struct FakeInner {
    memory: MemoryQaStore,
    script: Mutex<FakeScript>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(FakeInner {
                memory: MemoryQaStore::new(64),
                script: Mutex::new(FakeScript::default()),
                calls: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Underlying store, for seeding data without counting calls.
    pub fn memory(&self) -> &MemoryQaStore {
        &self.inner.memory
    }

    pub fn script<R>(&self, edit: impl FnOnce(&mut FakeScript) -> R) -> R {
        edit(&mut self.inner.script.lock().unwrap())
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.inner
            .calls
            .lock()
            .unwrap()
            .get(operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.inner.calls.lock().unwrap().values().sum()
    }

    fn record(&self, operation: &'static str) {
        *self.inner.calls.lock().unwrap().entry(operation).or_default() += 1;
    }

    fn fails(&self, check: impl FnOnce(&FakeScript) -> bool) -> bool {
        check(&self.inner.script.lock().unwrap())
    }
}

fn injected(operation: &str) -> StorageError {
    StorageError::unavailable(
        format!("{operation} failed"),
        io::Error::new(io::ErrorKind::ConnectionRefused, "injected failure"),
    )
}

impl QaStore for FakeStore {
    fn insert_session(&self, join_code: String) -> BoxFuture<'static, StorageResult<SessionEntity>> {
        self.record("insert_session");
        let scripted = self.script(|script| script.session_insert_errors.pop_front());
        let store = self.clone();
        Box::pin(async move {
            match scripted {
                Some(err) => Err(err),
                None => store.inner.memory.insert_session(join_code).await,
            }
        })
    }

    fn query_sessions_by_join_code(
        &self,
        join_code: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        self.record("query_sessions_by_join_code");
        let failing = self.fails(|script| script.fail_query_sessions);
        let extra = self.script(|script| script.extra_sessions.clone());
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("query_sessions_by_join_code"));
            }
            let mut rows = store
                .inner
                .memory
                .query_sessions_by_join_code(join_code.clone())
                .await?;
            rows.extend(
                extra
                    .into_iter()
                    .filter(|session| session.join_code == join_code),
            );
            Ok(rows)
        })
    }

    fn insert_question(
        &self,
        question: NewQuestion,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        self.record("insert_question");
        let failing = self.fails(|script| script.fail_insert_question);
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("insert_question"));
            }
            store.inner.memory.insert_question(question).await
        })
    }

    fn query_questions(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        self.record("query_questions");
        let failing = self.fails(|script| script.fail_query_questions);
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("query_questions"));
            }
            store.inner.memory.query_questions(session_id).await
        })
    }

    fn find_question(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        self.record("find_question");
        let failing = self.fails(|script| script.fail_find_question);
        let yielding = self.fails(|script| script.yield_in_fallback);
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("find_question"));
            }
            let found = store.inner.memory.find_question(question_id).await;
            if yielding {
                tokio::task::yield_now().await;
            }
            found
        })
    }

    fn atomic_increment_vote(
        &self,
        question_id: Uuid,
        delta: u32,
    ) -> BoxFuture<'static, StorageResult<u32>> {
        self.record("atomic_increment_vote");
        let failing = self.fails(|script| script.fail_atomic_vote);
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("atomic_increment_vote"));
            }
            store
                .inner
                .memory
                .atomic_increment_vote(question_id, delta)
                .await
        })
    }

    fn update_question_votes(
        &self,
        question_id: Uuid,
        votes: u32,
    ) -> BoxFuture<'static, StorageResult<QuestionEntity>> {
        self.record("update_question_votes");
        let failing = self.fails(|script| script.fail_update_votes);
        let store = self.clone();
        Box::pin(async move {
            if failing {
                return Err(injected("update_question_votes"));
            }
            store
                .inner
                .memory
                .update_question_votes(question_id, votes)
                .await
        })
    }

    fn subscribe(&self, session_id: Uuid) -> Subscription {
        self.inner.memory.subscribe(session_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let failing = self.fails(|script| script.fail_health_check);
        Box::pin(async move {
            if failing {
                return Err(injected("health_check"));
            }
            Ok(())
        })
    }
}
