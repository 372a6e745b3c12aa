//! Fan-out of collection snapshots to WebSocket subscribers.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use vitalog_core::CollectionKind;

/// Serialized full-collection snapshot, shared by every subscriber.
pub type Snapshot = Arc<str>;

/// Broadcast channels per (user, collection).
pub struct SyncHub {
    channels: RwLock<HashMap<(String, CollectionKind), broadcast::Sender<Snapshot>>>,
}

impl SyncHub {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe(&self, user_id: &str, kind: CollectionKind) -> broadcast::Receiver<Snapshot> {
        let key = (user_id.to_string(), kind);

        let mut channels = self.channels.write().await;
        match channels.get(&key) {
            Some(sender) => sender.subscribe(),
            None => {
                // Snapshots are full state, so a short buffer is enough.
                let (sender, receiver) = broadcast::channel(64);
                channels.insert(key, sender);
                receiver
            }
        }
    }

    /// Sends a snapshot to every subscriber of (user, collection).
    pub async fn publish(&self, user_id: &str, kind: CollectionKind, snapshot: Snapshot) {
        let key = (user_id.to_string(), kind);

        let mut channels = self.channels.write().await;
        if let Some(sender) = channels.get(&key) {
            if sender.send(snapshot).is_err() {
                // Nobody listens any more.
                channels.remove(&key);
            }
        }
    }
}

impl Default for SyncHub {
    fn default() -> Self {
        Self::new()
    }
}
