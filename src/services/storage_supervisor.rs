use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{qa_store::QaStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Connect to the storage backend and keep the shared state in degraded mode while it is unavailable.
///
/// Once installed, the store is health-checked every few seconds. A failed
/// check flips the degraded flag and retries with backoff; when the store does
/// not recover it is dropped and `connect` is called again.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn QaStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                watch_health(&state, store.as_ref()).await;

                warn!("storage did not recover; reconnecting");
                state.clear_store().await;
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll `health_check` until the store stays unhealthy for
/// [`MAX_RECOVERY_ATTEMPTS`] consecutive retries.
async fn watch_health(state: &SharedState, store: &dyn QaStore) {
    loop {
        sleep(HEALTH_POLL_INTERVAL).await;

        let Err(err) = store.health_check().await else {
            continue;
        };
        warn!(error = %err, "storage health check failed; entering degraded mode");
        state.update_degraded(true);

        let mut retry_delay = INITIAL_DELAY;
        let mut recovered = false;
        for attempt in 1..=MAX_RECOVERY_ATTEMPTS {
            sleep(retry_delay).await;
            match store.health_check().await {
                Ok(()) => {
                    recovered = true;
                    break;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "storage still unhealthy");
                    retry_delay = (retry_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !recovered {
            return;
        }
        info!("storage healthy again; leaving degraded mode");
        state.update_degraded(false);
    }
}
