//! Per-screen view of one session, kept in sync by polling and best-effort push.
//!
//! Both triggers reload the whole ledger and replace the cached list; push
//! payloads are never applied as diffs. Polling keeps running while a
//! subscription is active since push delivery is not guaranteed.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval, sleep_until},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        models::{QuestionChange, QuestionEntity, SessionEntity},
        qa_store::Subscription,
    },
    error::ServiceError,
    services::qa_core::QaCore,
    sync::{
        cooldown::Cooldown,
        message::{Message, MessageStatus},
    },
};

/// Why a send never left the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Nothing left after trimming.
    Empty,
    /// A previous send is still cooling down.
    CoolingDown { remaining: Duration },
}

/// Result of [`SyncClient::send`].
#[derive(Debug)]
pub enum SendOutcome {
    /// Echoed locally; persistence runs in the background.
    Accepted(PendingSend),
    /// Silently ignored: no echo, no backend call.
    Dropped(DropReason),
}

/// Handle on the background persistence of an accepted send.
#[derive(Debug)]
pub struct PendingSend {
    /// Local id of the optimistic echo.
    pub message_id: Uuid,
    pub task: JoinHandle<Result<QuestionEntity, ServiceError>>,
}

/// Point-in-time copy of what a screen renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub join_code: String,
    pub session_id: Option<Uuid>,
    /// Ranked as of the last reload, followed by newer optimistic echoes.
    pub messages: Vec<Message>,
    pub last_error: Option<String>,
    /// Whole seconds until sending is possible again, rounded up.
    pub cooldown_secs: u64,
}

#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<Inner>,
}

struct Inner {
    core: QaCore,
    join_code: String,
    poll_interval: Duration,
    push: bool,
    view: Mutex<View>,
    changes: watch::Sender<u64>,
}

struct View {
    session: Option<SessionEntity>,
    messages: Vec<Message>,
    last_error: Option<String>,
    cooldown: Cooldown,
}

impl SyncClient {
    pub fn new(core: QaCore, join_code: impl Into<String>, config: &AppConfig) -> Self {
        let (changes, _rx) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                core,
                join_code: join_code.into(),
                poll_interval: config.poll_interval,
                push: config.push_updates,
                view: Mutex::new(View {
                    session: None,
                    messages: Vec::new(),
                    last_error: None,
                    cooldown: Cooldown::new(config.send_cooldown),
                }),
                changes,
            }),
        }
    }

    /// Version counter bumped on every visible change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.changes.subscribe()
    }

    pub async fn snapshot(&self) -> SyncSnapshot {
        let view = self.inner.view.lock().await;
        SyncSnapshot {
            join_code: self.inner.join_code.clone(),
            session_id: view.session.as_ref().map(|session| session.id),
            messages: view.messages.clone(),
            last_error: view.last_error.clone(),
            cooldown_secs: view.cooldown.remaining_secs(Instant::now()),
        }
    }

    /// Submit `text`, echoing it locally before the backend confirms.
    ///
    /// Blank text and sends during the cooldown are dropped without touching
    /// the view or the backend. An accepted send starts the cooldown at once.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank message");
            return SendOutcome::Dropped(DropReason::Empty);
        }

        let message = {
            let mut view = self.inner.view.lock().await;
            if let Err(remaining) = view.cooldown.try_begin(Instant::now()) {
                debug!(?remaining, "send dropped during cooldown");
                return SendOutcome::Dropped(DropReason::CoolingDown { remaining });
            }
            let message = Message::pending(text);
            view.messages.push(message.clone());
            message
        };
        self.notify();

        let client = self.clone();
        let text = text.to_string();
        let message_id = message.id;
        let task = tokio::spawn(async move { client.persist(message_id, &text).await });

        SendOutcome::Accepted(PendingSend { message_id, task })
    }

    async fn persist(&self, message_id: Uuid, text: &str) -> Result<QuestionEntity, ServiceError> {
        let result = match self.session().await {
            Ok(session) => self.inner.core.ledger().submit(session.id, text).await,
            Err(err) => Err(err),
        };

        let mut view = self.inner.view.lock().await;
        let echo = view
            .messages
            .iter_mut()
            .find(|message| message.id == message_id);
        match &result {
            Ok(question) => {
                if let Some(echo) = echo {
                    echo.confirm(question);
                }
            }
            Err(err) => {
                warn!(join_code = %self.inner.join_code, error = %err, "failed to persist message");
                if let Some(echo) = echo {
                    echo.status = MessageStatus::Failed;
                }
                view.last_error = Some(err.to_string());
            }
        }
        drop(view);
        self.notify();

        result
    }

    /// Session behind the join code, resolved once and cached.
    async fn session(&self) -> Result<SessionEntity, ServiceError> {
        if let Some(session) = self.inner.view.lock().await.session.clone() {
            return Ok(session);
        }

        let resolved = self
            .inner
            .core
            .registry()
            .resolve_join_code(&self.inner.join_code)
            .await?;
        self.inner.view.lock().await.session = Some(resolved.session.clone());
        Ok(resolved.session)
    }

    /// Reload the ranked ledger and replace the cached list.
    ///
    /// A failure is logged and recorded; the previous list stays visible.
    pub async fn refresh(&self) -> Result<(), ServiceError> {
        let result = self
            .inner
            .core
            .ledger()
            .list_by_join_code(&self.inner.join_code)
            .await;

        let mut view = self.inner.view.lock().await;
        let outcome = match result {
            Ok(ledger) => {
                view.session = Some(ledger.session.session);
                view.messages = ledger.questions.into_iter().map(Message::from).collect();
                view.last_error = None;
                Ok(())
            }
            Err(err) => {
                warn!(join_code = %self.inner.join_code, error = %err, "ledger reload failed");
                view.last_error = Some(err.to_string());
                Err(err)
            }
        };
        drop(view);
        self.notify();

        outcome
    }

    /// Drive polling, push reloads and the cooldown timer until `shutdown` resolves.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut poll = interval(self.inner.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut subscription: Option<Subscription> = None;

        info!(join_code = %self.inner.join_code, "sync client started");
        loop {
            let cooldown_deadline = self.inner.view.lock().await.cooldown.deadline();

            tokio::select! {
                _ = &mut shutdown => break,
                _ = poll.tick() => {
                    if self.refresh().await.is_ok() && subscription.is_none() {
                        subscription = self.subscribe().await;
                    }
                }
                change = next_change(&mut subscription) => match change {
                    Some(change) => {
                        debug!(question_id = ?changed_question(&change), "push received; reloading");
                        let _ = self.refresh().await;
                    }
                    None => {
                        debug!("change feed closed; resubscribing after the next poll");
                        subscription = None;
                    }
                },
                _ = wait_until(cooldown_deadline) => {
                    let ended = self.inner.view.lock().await.cooldown.tick(Instant::now());
                    if ended {
                        self.notify();
                    }
                }
            }
        }
        info!(join_code = %self.inner.join_code, "sync client stopped");
    }

    async fn subscribe(&self) -> Option<Subscription> {
        if !self.inner.push {
            return None;
        }
        let session_id = self.inner.view.lock().await.session.as_ref()?.id;
        Some(self.inner.core.subscribe(session_id))
    }

    fn notify(&self) {
        self.inner
            .changes
            .send_modify(|version| *version = version.wrapping_add(1));
    }
}

async fn next_change(subscription: &mut Option<Subscription>) -> Option<QuestionChange> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn changed_question(change: &QuestionChange) -> Uuid {
    match change {
        QuestionChange::Inserted(question) => question.id,
        QuestionChange::VotesChanged { question_id, .. } => *question_id,
    }
}
