//! Change feed for the presentation layer.
//!
//! Every mutation of a [`SharedNotificationStore`](crate::SharedNotificationStore)
//! publishes a [`StoreUpdate`] on a tokio broadcast channel. Renderers subscribe
//! and re-read the snapshot; slow receivers lose old updates, never the state.

use brandhub_core::ScopeId;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::NotificationKind;

/// Default buffer size for the change channel.
const DEFAULT_BUFFER_SIZE: usize = 256;

/// What changed in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StoreChange {
    HistoryLoaded { records: usize },
    Inserted { id: String, kind: NotificationKind },
    MarkedRead { id: String },
    AllMarkedRead,
    Removed { id: String },
    Cleared { removed: usize },
}

/// A store change together with the unread count after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub scope_id: ScopeId,
    pub change: StoreChange,
    pub unread_count: usize,
}

#[derive(Clone)]
pub struct StoreBroadcaster {
    sender: broadcast::Sender<StoreUpdate>,
}

impl StoreBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an update. Returns the number of subscribers that received it.
    pub fn send(&self, update: StoreUpdate) -> usize {
        self.sender.send(update).unwrap_or_default()
    }

    /// Updates sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for StoreBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoreBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
