use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;
use uuid::Uuid;

use crate::dao::models::QuestionChange;

/// Broadcast hub fanning store changes out to every subscriber.
///
/// Delivery is best effort: slow subscribers lose the oldest events and nobody
/// is told about changes made through another process.
pub struct ChangeFeed {
    sender: broadcast::Sender<QuestionChange>,
}

impl ChangeFeed {
    /// Construct a new feed backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send a change to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, change: QuestionChange) {
        let _ = self.sender.send(change);
    }

    /// Register a subscriber that only sees changes for `session_id`.
    pub fn subscribe(&self, session_id: Uuid) -> Subscription {
        Subscription {
            session_id,
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receiving end of a [`ChangeFeed`] filtered to one session.
pub struct Subscription {
    session_id: Uuid,
    receiver: broadcast::Receiver<QuestionChange>,
}

impl Subscription {
    /// Session this subscription is scoped to.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Wait for the next change of the session; `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<QuestionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.session_id() == self.session_id => return Some(change),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(session_id = %self.session_id, skipped, "change subscription lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes_changed(session_id: Uuid, votes: u32) -> QuestionChange {
        QuestionChange::VotesChanged {
            question_id: Uuid::new_v4(),
            session_id,
            votes,
        }
    }

    #[tokio::test]
    async fn subscription_filters_other_sessions() {
        let feed = ChangeFeed::new(8);
        let mine = Uuid::new_v4();
        let mut subscription = feed.subscribe(mine);

        feed.publish(votes_changed(Uuid::new_v4(), 1));
        feed.publish(votes_changed(mine, 2));

        let change = subscription.next().await.unwrap();
        assert_eq!(change.session_id(), mine);
        assert!(matches!(change, QuestionChange::VotesChanged { votes: 2, .. }));
    }

    #[tokio::test]
    async fn lagged_subscription_keeps_receiving() {
        let feed = ChangeFeed::new(2);
        let session = Uuid::new_v4();
        let mut subscription = feed.subscribe(session);

        for votes in 1..=5 {
            feed.publish(votes_changed(session, votes));
        }

        let change = subscription.next().await.unwrap();
        assert!(matches!(change, QuestionChange::VotesChanged { votes: 4, .. }));
    }

    #[tokio::test]
    async fn dropping_feed_ends_subscription() {
        let feed = ChangeFeed::new(2);
        let mut subscription = feed.subscribe(Uuid::new_v4());
        drop(feed);
        assert!(subscription.next().await.is_none());
    }
}
