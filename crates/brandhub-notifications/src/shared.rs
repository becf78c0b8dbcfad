use std::sync::Arc;

use brandhub_core::ScopeId;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::broadcast::{StoreBroadcaster, StoreChange, StoreUpdate};
use crate::events::LiveEvent;
use crate::store::{HistoryIngest, LiveIngest, MarkRead, NotificationStore, RemovedRecord, StoreSnapshot};
use crate::types::{HistoryPage, NotificationRecord};

/// Session-owned handle to the notification store.
///
/// Each method takes the lock, performs one synchronous mutation and
/// publishes the resulting change. The lock is never held across an await,
/// so every mutation is atomic with respect to every other one.
#[derive(Clone)]
pub struct SharedNotificationStore {
    inner: Arc<Mutex<NotificationStore>>,
    changes: StoreBroadcaster,
    scope: ScopeId,
}

impl SharedNotificationStore {
    pub fn new(scope: ScopeId) -> Self {
        Self::with_broadcaster(scope, StoreBroadcaster::new())
    }

    pub fn with_broadcaster(scope: ScopeId, changes: StoreBroadcaster) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NotificationStore::new(scope.clone()))),
            changes,
            scope,
        }
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.changes.subscribe()
    }

    pub fn ingest_history(&self, page: HistoryPage) -> HistoryIngest {
        let mut store = self.inner.lock();
        let outcome = store.ingest_history(page);
        self.publish(
            &store,
            StoreChange::HistoryLoaded {
                records: store.len(),
            },
        );
        outcome
    }

    pub fn ingest_live_event(&self, event: LiveEvent) -> LiveIngest {
        let id = event.id().to_string();
        let mut store = self.inner.lock();
        let outcome = store.ingest_live_event(event);
        if let LiveIngest::Inserted(kind) = outcome {
            self.publish(&store, StoreChange::Inserted { id, kind });
        }
        outcome
    }

    pub fn mark_read(&self, id: &str) -> MarkRead {
        let mut store = self.inner.lock();
        let outcome = store.mark_read(id);
        if outcome == MarkRead::Marked {
            self.publish(&store, StoreChange::MarkedRead { id: id.to_string() });
        }
        outcome
    }

    pub fn mark_off_page_read(&self, id: &str) -> MarkRead {
        let mut store = self.inner.lock();
        let outcome = store.mark_off_page_read(id);
        if matches!(outcome, MarkRead::Marked | MarkRead::Untracked) {
            self.publish(&store, StoreChange::MarkedRead { id: id.to_string() });
        }
        outcome
    }

    pub fn mark_all_read(&self) -> usize {
        let mut store = self.inner.lock();
        let changed = store.mark_all_read();
        self.publish(&store, StoreChange::AllMarkedRead);
        changed
    }

    pub fn remove(&self, id: &str) -> Option<RemovedRecord> {
        let mut store = self.inner.lock();
        let removed = store.remove(id);
        if removed.is_some() {
            self.publish(&store, StoreChange::Removed { id: id.to_string() });
        }
        removed
    }

    pub fn clear(&self) -> Vec<RemovedRecord> {
        let mut store = self.inner.lock();
        let removed = store.clear();
        self.publish(
            &store,
            StoreChange::Cleared {
                removed: removed.len(),
            },
        );
        removed
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().unread_count()
    }

    pub fn is_durable(&self, id: &str) -> Option<bool> {
        self.inner.lock().is_durable(id)
    }

    pub fn get(&self, id: &str) -> Option<NotificationRecord> {
        self.inner.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.lock().snapshot()
    }

    /// Run a read-only closure against the store.
    pub fn read<R>(&self, f: impl FnOnce(&NotificationStore) -> R) -> R {
        f(&self.inner.lock())
    }

    fn publish(&self, store: &NotificationStore, change: StoreChange) {
        self.changes.send(StoreUpdate {
            scope_id: self.scope.clone(),
            change,
            unread_count: store.unread_count(),
        });
    }
}

impl std::fmt::Debug for SharedNotificationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedNotificationStore")
            .field("scope", &self.scope)
            .field("changes", &self.changes)
            .finish()
    }
}
