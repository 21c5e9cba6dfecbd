use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::qa_store::Subscription,
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    services::{qa_core::QaCore, sse_events},
    state::{SharedState, SseHub},
};

/// How often an idle fan-out task checks whether anyone still listens.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// A viewer's receiver on a session hub plus the handshake to send first.
pub struct SessionStream {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub handshake: Handshake,
}

/// Resolve `join_code` and subscribe to the session's hub, starting the
/// fan-out from the store when this is the first viewer.
pub async fn subscribe_session(
    state: &SharedState,
    core: &QaCore,
    join_code: &str,
) -> Result<SessionStream, ServiceError> {
    let resolved = core.registry().resolve_join_code(join_code).await?;
    let session_id = resolved.session.id;

    let (receiver, created) = state.hubs().subscribe(session_id);
    if let Some(hub) = created {
        tokio::spawn(fan_out(state.clone(), core.subscribe(session_id), hub));
    }

    Ok(SessionStream {
        receiver,
        handshake: Handshake {
            session_id,
            join_code: resolved.session.join_code,
        },
    })
}

/// Forward store changes of one session into its hub until nobody listens
/// or the store's feed closes.
async fn fan_out(state: SharedState, mut subscription: Subscription, hub: Arc<SseHub>) {
    let session_id = subscription.session_id();
    let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);
    idle_check.tick().await;

    loop {
        tokio::select! {
            change = subscription.next() => {
                let Some(change) = change else {
                    debug!(%session_id, "change feed closed");
                    break;
                };
                if let Some(event) = sse_events::change_event(change) {
                    hub.broadcast(event);
                }
            }
            _ = idle_check.tick() => {}
        }

        if hub.receiver_count() == 0 && state.hubs().release_if_idle(session_id) {
            debug!(%session_id, "no viewers left; stopping fan-out");
            return;
        }
    }

    state.hubs().release(session_id, &hub);
}

/// Convert a hub receiver into an SSE response, sending `handshake` first.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    session_id: Uuid,
    handshake: Option<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        if let Some(handshake) = handshake {
            if tx.send(Ok(to_event(handshake))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Viewers reload the whole ledger on the next event or poll.
                            debug!(%session_id, skipped, "SSE viewer lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(%session_id, "session SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
