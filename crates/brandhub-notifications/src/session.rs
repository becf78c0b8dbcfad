//! Per-scope wiring and the session manager.
//!
//! A [`NotificationSession`] owns everything that belongs to one signed-in
//! brand: the store, the live channel and the reconciler. The
//! [`SessionManager`] holds at most one session and replaces it when the scope
//! changes, so a channel never outlives the scope it was opened for.

use std::sync::Arc;
use std::time::Duration;

use brandhub_core::ScopeId;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{info, warn};

use crate::api::NotificationApi;
use crate::audio::AudioCue;
use crate::broadcast::{StoreBroadcaster, StoreUpdate};
use crate::channel::{ChannelConnector, ConnectionStatus, EventChannelClient};
use crate::error::{ApiError, SessionError};
use crate::reconciler::Reconciler;
use crate::shared::SharedNotificationStore;
use crate::store::HistoryIngest;

fn default_fallback_delay_ms() -> u64 {
    250
}

fn default_audio_timeout_ms() -> u64 {
    5_000
}

fn default_broadcast_capacity() -> usize {
    256
}

/// Tunables for a notification session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationSettings {
    /// Pause between single deletes when the bulk delete fails
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
    /// Upper bound for one audio cue
    #[serde(default = "default_audio_timeout_ms")]
    pub audio_timeout_ms: u64,
    /// Buffered store updates per subscriber
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            fallback_delay_ms: default_fallback_delay_ms(),
            audio_timeout_ms: default_audio_timeout_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl NotificationSettings {
    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.audio_timeout_ms == 0 {
            return Err("notifications.audio_timeout_ms must be > 0".into());
        }
        if self.broadcast_capacity == 0 {
            return Err("notifications.broadcast_capacity must be > 0".into());
        }
        Ok(())
    }
}

/// Collaborators shared by every session the process opens.
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn NotificationApi>,
    pub connector: Arc<dyn ChannelConnector>,
    pub audio: Arc<dyn AudioCue>,
}

pub struct NotificationSession {
    scope: ScopeId,
    api: Arc<dyn NotificationApi>,
    store: SharedNotificationStore,
    channel: EventChannelClient,
    reconciler: Reconciler,
}

impl NotificationSession {
    pub fn new(scope: ScopeId, deps: &SessionDeps, settings: &NotificationSettings) -> Self {
        let store = SharedNotificationStore::with_broadcaster(
            scope.clone(),
            StoreBroadcaster::with_capacity(settings.broadcast_capacity),
        );
        let channel = EventChannelClient::new(
            deps.connector.clone(),
            store.clone(),
            deps.audio.clone(),
        )
        .with_cue_timeout(settings.audio_timeout());
        let reconciler = Reconciler::new(deps.api.clone(), store.clone())
            .with_fallback_delay(settings.fallback_delay());

        Self {
            scope,
            api: deps.api.clone(),
            store,
            channel,
            reconciler,
        }
    }

    /// Load history, then open the live channel.
    ///
    /// The channel is opened even when the history fetch fails; the history
    /// error is still reported so the caller can retry with
    /// [`refresh_history`](Self::refresh_history).
    pub async fn start(&self) -> Result<(), SessionError> {
        let history = self.refresh_history().await;
        self.channel.connect(Some(self.scope.as_str())).await?;
        history?;
        Ok(())
    }

    /// Fetch the history page and merge it into the store.
    pub async fn refresh_history(&self) -> Result<HistoryIngest, ApiError> {
        match self.api.fetch_history(&self.scope).await {
            Ok(page) => {
                let outcome = self.store.ingest_history(page);
                info!(
                    scope_id = %self.scope,
                    records = outcome.history_records,
                    retained_live = outcome.retained_live,
                    unread = self.store.unread_count(),
                    "Notification history loaded"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(scope_id = %self.scope, error = %e, "Failed to fetch notification history");
                Err(e)
            }
        }
    }

    /// Tear down the channel and drop every record.
    pub async fn shutdown(&self) {
        self.channel.disconnect().await;
        let removed = self.store.clear();
        info!(scope_id = %self.scope, removed = removed.len(), "Notification session closed");
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn store(&self) -> &SharedNotificationStore {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.channel.status()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.channel.subscribe_status()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreUpdate> {
        self.store.subscribe()
    }
}

/// Holds the one live session of the process.
pub struct SessionManager {
    deps: SessionDeps,
    settings: NotificationSettings,
    current: Mutex<Option<Arc<NotificationSession>>>,
}

impl SessionManager {
    pub fn new(deps: SessionDeps, settings: NotificationSettings) -> Self {
        Self {
            deps,
            settings,
            current: Mutex::new(None),
        }
    }

    /// Make `scope_id` the active scope.
    ///
    /// The previous session is shut down before the new one starts. An absent
    /// or empty scope only logs out. A session whose start failed is kept, so
    /// whatever did load stays visible.
    pub async fn switch_scope(&self, scope_id: Option<&str>) -> Option<Arc<NotificationSession>> {
        let mut current = self.current.lock().await;

        if let (Some(active), Some(raw)) = (current.as_ref(), scope_id)
            && active.scope().matches(raw)
        {
            return Some(active.clone());
        }

        if let Some(previous) = current.take() {
            previous.shutdown().await;
        }

        let scope = ScopeId::from_optional(scope_id)?;
        let session = Arc::new(NotificationSession::new(scope, &self.deps, &self.settings));
        if let Err(e) = session.start().await {
            warn!(scope_id = %session.scope(), error = %e, "Notification session started degraded");
        }
        *current = Some(session.clone());
        Some(session)
    }

    pub async fn logout(&self) {
        if let Some(previous) = self.current.lock().await.take() {
            previous.shutdown().await;
        }
    }

    pub async fn current(&self) -> Option<Arc<NotificationSession>> {
        self.current.lock().await.clone()
    }
}
