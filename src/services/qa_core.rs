use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::qa_store::{QaStore, Subscription},
    services::{
        question_ledger::QuestionLedger, session_registry::SessionRegistry,
        vote_aggregator::VoteAggregator,
    },
};

/// The three core components wired to one injected store.
#[derive(Clone)]
pub struct QaCore {
    store: Arc<dyn QaStore>,
    registry: SessionRegistry,
    ledger: QuestionLedger,
    votes: VoteAggregator,
}

impl QaCore {
    pub fn new(store: Arc<dyn QaStore>, config: &AppConfig) -> Self {
        let registry =
            SessionRegistry::new(store.clone()).with_max_attempts(config.max_join_code_attempts);
        Self {
            ledger: QuestionLedger::new(store.clone(), registry.clone()),
            votes: VoteAggregator::new(store.clone()),
            registry,
            store,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &QuestionLedger {
        &self.ledger
    }

    pub fn votes(&self) -> &VoteAggregator {
        &self.votes
    }

    /// Best-effort change notifications for one session.
    pub fn subscribe(&self, session_id: Uuid) -> Subscription {
        self.store.subscribe(session_id)
    }
}
