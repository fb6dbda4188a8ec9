//! Engine status and change notifications.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::document::{Collection, TypeTag};
use crate::sync::SyncReport;

/// Snapshot returned by `SyncEngine::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Result of the most recent connectivity probe.
    pub is_online: bool,
    /// Continuous replication flag. There is no continuous mode, so this is
    /// always `false`.
    pub sync_active: bool,
}

/// Something changed in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A document was appended to its collection.
    DocumentSaved {
        /// Collection the document went into.
        collection: Collection,
        /// Id of the new document.
        id: String,
        /// Kind of record saved.
        type_tag: TypeTag,
    },
    /// A document was removed.
    DocumentDeleted {
        /// Collection the document was removed from.
        collection: Collection,
        /// Id of the removed document.
        id: String,
    },
    /// A collection slot was dropped.
    CollectionCleared {
        /// The cleared collection.
        collection: Collection,
    },
    /// A manual sync pass finished.
    SyncCompleted(SyncReport),
    /// A probe flipped the online flag.
    ConnectivityChanged {
        /// The new flag.
        online: bool,
    },
}

/// Fan-out channel for [`EngineEvent`]s.
///
/// Publishing never blocks and never fails. With no subscribers the event is
/// dropped; a subscriber that falls more than the channel capacity behind
/// loses the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to every current subscriber.
    pub fn publish(&self, event: EngineEvent) {
        debug!("Publishing {:?}", event);
        let _ = self.sender.send(event);
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Call `callback` for every event until the bus is dropped.
    ///
    /// Must be called from within a tokio runtime. Abort the returned handle
    /// to unregister.
    pub fn on_change<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(EngineEvent) + Send + 'static,
    {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => callback(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Change listener lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
