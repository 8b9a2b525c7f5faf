use crate::db::Store;
use crate::events::ChangeEvent;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<Store>>,
    pub events_tx: broadcast::Sender<ChangeEvent>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        let (events_tx, _rx) = broadcast::channel(1024);
        Self {
            store: Arc::new(Mutex::new(store)),
            events_tx,
        }
    }

    /// Broadcast a change notification. No subscribers is not an error.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.events_tx.send(event);
    }
}
