mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::qa_store::QaStore, error::ServiceError, services::qa_core::QaCore,
};

pub use self::sse::{SessionHubs, SseHub};

pub type SharedState = Arc<AppState>;

/// Central application state holding the installed store and the SSE hubs.
pub struct AppState {
    store: RwLock<Option<Arc<dyn QaStore>>>,
    degraded: watch::Sender<bool>,
    hubs: SessionHubs,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            degraded: degraded_tx,
            hubs: SessionHubs::new(config.sse_capacity),
            config,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn QaStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn QaStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Installed store, or [`ServiceError::Degraded`] when storage is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn QaStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Core components bound to the installed store.
    pub async fn core(&self) -> Result<QaCore, ServiceError> {
        let store = self.require_store().await?;
        Ok(QaCore::new(store, &self.config))
    }

    pub fn hubs(&self) -> &SessionHubs {
        &self.hubs
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
