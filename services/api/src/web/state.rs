//! services/api/src/web/state.rs
//!
//! Defines the service's shared state.

use crate::adapters::BroadcastRenderer;
use crate::config::Config;
use crate::web::protocol::ServerMessage;
use flower_timer_core::{Clock, PersistenceStore, StorageBackend, Timer};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// How many unread events a slow page may fall behind before it starts
/// missing ticks.
const EVENT_BUFFER: usize = 256;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// There is exactly one timer per service; every connected page observes it
/// through `events`.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<PersistenceStore>,
    pub timer: Arc<Mutex<Timer>>,
    pub events: broadcast::Sender<ServerMessage>,
}

impl AppState {
    /// Wires the store, renderer and timer together over the given backend.
    pub async fn build(
        config: Arc<Config>,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let store = Arc::new(
            PersistenceStore::new(backend, clock).with_key(config.storage_key.clone()),
        );
        let renderer = Arc::new(BroadcastRenderer::new(events.clone()));
        let timer = Timer::new(store.clone(), renderer).await;

        Arc::new(Self {
            config,
            store,
            timer: Arc::new(Mutex::new(timer)),
            events,
        })
    }

    /// Sends an event to every connected page. Having none is fine.
    pub fn publish(&self, message: ServerMessage) {
        let _ = self.events.send(message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.events.subscribe()
    }
}
