use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Per-session SSE hubs, created on first subscriber.
pub struct SessionHubs {
    hubs: DashMap<Uuid, Arc<SseHub>>,
    capacity: usize,
}

impl SessionHubs {
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to the hub of `session_id`.
    ///
    /// The hub is returned alongside the receiver only when this call created
    /// it; the caller is then responsible for feeding it.
    pub fn subscribe(
        &self,
        session_id: Uuid,
    ) -> (broadcast::Receiver<ServerEvent>, Option<Arc<SseHub>>) {
        match self.hubs.entry(session_id) {
            Entry::Occupied(entry) => (entry.get().subscribe(), None),
            Entry::Vacant(entry) => {
                let hub = Arc::new(SseHub::new(self.capacity));
                let receiver = hub.subscribe();
                entry.insert(hub.clone());
                (receiver, Some(hub))
            }
        }
    }

    /// Drop the hub of `session_id` if nobody listens anymore. Returns whether it was removed.
    pub fn release_if_idle(&self, session_id: Uuid) -> bool {
        self.hubs
            .remove_if(&session_id, |_, hub| hub.receiver_count() == 0)
            .is_some()
    }

    /// Drop `hub` if it is still the one registered for `session_id`,
    /// closing the streams of its listeners.
    pub fn release(&self, session_id: Uuid, hub: &Arc<SseHub>) {
        self.hubs
            .remove_if(&session_id, |_, current| Arc::ptr_eq(current, hub));
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
