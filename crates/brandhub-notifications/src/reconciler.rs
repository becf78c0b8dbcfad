//! Bridges user actions to server truth.
//!
//! Mark-read and single delete are conservative: the server call runs first
//! and the store only changes after it succeeds. Delete-all is the exception.
//! The store is cleared the moment it is requested, then the server is brought
//! in line through the bulk endpoint or, failing that, one delete per record.
//! A failed fallback can leave records on the server that the client no longer
//! shows; they come back with the next history fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use brandhub_core::ScopeId;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::api::NotificationApi;
use crate::error::ReconcileError;
use crate::shared::SharedNotificationStore;
use crate::store::{MarkRead, RemovedRecord};

/// Pause between single deletes in the delete-all fallback.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(250);

/// Which path completed a delete-all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", rename_all = "camelCase")]
pub enum DeleteAllTier {
    /// The bulk endpoint accepted the request.
    Bulk,
    /// The bulk endpoint failed and every durable record was deleted one by one.
    /// `failed` holds the ids the server did not confirm.
    Fallback { attempted: usize, failed: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllReport {
    /// Records removed from the store when the request was made
    pub cleared_locally: usize,
    /// Records only the client knew about; never sent to the server
    pub skipped_local: usize,
    pub tier: DeleteAllTier,
}

impl DeleteAllReport {
    /// True when the server confirmed every deletion.
    pub fn is_consistent(&self) -> bool {
        match &self.tier {
            DeleteAllTier::Bulk => true,
            DeleteAllTier::Fallback { failed, .. } => failed.is_empty(),
        }
    }
}

/// Outcome of a confirmed single delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deleted {
    /// The server confirmed and the record was removed.
    Confirmed,
    /// The record existed only on the client and was removed locally.
    LocalOnly,
    /// The server confirmed but the store no longer held the record.
    NotHeld,
}

#[derive(Clone)]
pub struct Reconciler {
    api: Arc<dyn NotificationApi>,
    store: SharedNotificationStore,
    fallback_delay: Duration,
}

impl Reconciler {
    pub fn new(api: Arc<dyn NotificationApi>, store: SharedNotificationStore) -> Self {
        Self {
            api,
            store,
            fallback_delay: DEFAULT_FALLBACK_DELAY,
        }
    }

    #[must_use]
    pub fn with_fallback_delay(mut self, delay: Duration) -> Self {
        self.fallback_delay = delay;
        self
    }

    pub fn store(&self) -> &SharedNotificationStore {
        &self.store
    }

    /// Mark one record read once the server confirms.
    ///
    /// An id the store no longer holds changes nothing, so a confirmation
    /// that lands after a delete of the same record is harmless.
    pub async fn request_mark_read(&self, id: &str) -> Result<MarkRead, ReconcileError> {
        self.confirm_mark_read(id).await?;
        let outcome = self.store.mark_read(id);
        debug!(
            scope_id = %self.store.scope(),
            notification_id = %id,
            ?outcome,
            "Marked notification read"
        );
        Ok(outcome)
    }

    /// Mark a record read that sits on a history page the store never
    /// fetched. Takes one off the untracked unread total once confirmed.
    pub async fn request_mark_off_page_read(&self, id: &str) -> Result<MarkRead, ReconcileError> {
        self.confirm_mark_read(id).await?;
        let outcome = self.store.mark_off_page_read(id);
        debug!(
            scope_id = %self.store.scope(),
            notification_id = %id,
            ?outcome,
            "Marked off-page notification read"
        );
        Ok(outcome)
    }

    async fn confirm_mark_read(&self, id: &str) -> Result<(), ReconcileError> {
        let scope = self.store.scope();
        self.api.mark_read(scope, id).await.map_err(|e| {
            warn!(
                scope_id = %scope,
                notification_id = %id,
                transient = e.is_transient(),
                error = %e,
                "Mark-read not confirmed, store left unchanged"
            );
            ReconcileError::new("mark-read", Some(id), e)
        })
    }

    /// Mark every record read once the server confirms. Returns how many
    /// held records changed.
    pub async fn request_mark_all_read(&self) -> Result<usize, ReconcileError> {
        let scope = self.store.scope();
        if let Err(e) = self.api.mark_all_read(scope).await {
            warn!(
                scope_id = %scope,
                transient = e.is_transient(),
                error = %e,
                "Mark-all-read not confirmed, store left unchanged"
            );
            return Err(ReconcileError::new("mark-all-read", None, e));
        }

        let changed = self.store.mark_all_read();
        info!(scope_id = %scope, changed, "Marked all notifications read");
        Ok(changed)
    }

    /// Delete one record once the server confirms.
    ///
    /// A record the server never assigned an id to is removed locally.
    pub async fn request_delete(&self, id: &str) -> Result<Deleted, ReconcileError> {
        let scope = self.store.scope();
        if self.store.is_durable(id) == Some(false) {
            self.store.remove(id);
            debug!(scope_id = %scope, notification_id = %id, "Removed client-only notification");
            return Ok(Deleted::LocalOnly);
        }

        if let Err(e) = self.api.delete(scope, id).await {
            warn!(
                scope_id = %scope,
                notification_id = %id,
                transient = e.is_transient(),
                error = %e,
                "Delete not confirmed, store left unchanged"
            );
            return Err(ReconcileError::new("delete", Some(id), e));
        }

        match self.store.remove(id) {
            Some(_) => {
                debug!(scope_id = %scope, notification_id = %id, "Deleted notification");
                Ok(Deleted::Confirmed)
            }
            None => Ok(Deleted::NotHeld),
        }
    }

    /// Clear the store now and reconcile with the server in the returned future.
    ///
    /// The store is already empty when this returns, whether or not the future
    /// is ever polled. The future never fails; the report says which tier ran
    /// and which ids the server did not confirm.
    pub fn request_delete_all(&self) -> impl Future<Output = DeleteAllReport> + Send + 'static {
        let removed = self.store.clear();
        let cleared_locally = removed.len();
        let (durable, local): (Vec<RemovedRecord>, Vec<RemovedRecord>) =
            removed.into_iter().partition(|r| r.durable);
        let ids: Vec<String> = durable.into_iter().map(|r| r.record.id).collect();
        let skipped_local = local.len();

        let api = self.api.clone();
        let scope = self.store.scope().clone();
        let delay = self.fallback_delay;
        info!(scope_id = %scope, cleared_locally, "Cleared notifications locally");

        async move {
            let tier = match api.clear_all(&scope).await {
                Ok(()) => {
                    info!(scope_id = %scope, "Bulk delete confirmed");
                    DeleteAllTier::Bulk
                }
                Err(e) => {
                    warn!(
                        scope_id = %scope,
                        transient = e.is_transient(),
                        error = %e,
                        records = ids.len(),
                        "Bulk delete failed, deleting records one by one"
                    );
                    delete_sequentially(api.as_ref(), &scope, ids, delay).await
                }
            };

            DeleteAllReport {
                cleared_locally,
                skipped_local,
                tier,
            }
        }
    }
}

async fn delete_sequentially(
    api: &dyn NotificationApi,
    scope: &ScopeId,
    ids: Vec<String>,
    delay: Duration,
) -> DeleteAllTier {
    let attempted = ids.len();
    let mut failed = Vec::new();

    for (index, id) in ids.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match api.delete(scope, &id).await {
            Ok(()) => debug!(scope_id = %scope, notification_id = %id, "Fallback delete confirmed"),
            Err(e) => {
                warn!(
                    scope_id = %scope,
                    notification_id = %id,
                    error = %e,
                    "Fallback delete failed, continuing"
                );
                failed.push(id);
            }
        }
    }

    if failed.is_empty() {
        info!(scope_id = %scope, attempted, "Fallback delete completed");
    } else {
        warn!(
            scope_id = %scope,
            attempted,
            failed = failed.len(),
            "Fallback delete left records on the server"
        );
    }

    DeleteAllTier::Fallback { attempted, failed }
}
