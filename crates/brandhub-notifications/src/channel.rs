//! Live order-event channel.
//!
//! One [`EventChannelClient`] belongs to one session and keeps at most one
//! connection open. Every inbound event is checked against the session's
//! scope before it reaches the store; events for another brand are dropped
//! without a trace beyond a debug log.
//!
//! A dropped connection is not retried. Events missed while disconnected are
//! backfilled by the next history fetch, and ordering across a reconnect is
//! not guaranteed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use brandhub_core::ScopeId;
use futures_util::stream::BoxStream;
use futures_util::{SinkExt, StreamExt, future};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::audio::{AudioCue, DEFAULT_CUE_TIMEOUT, spawn_cue};
use crate::error::ChannelError;
use crate::events::{LiveEvent, subscribe_frame};
use crate::shared::SharedNotificationStore;
use crate::store::LiveIngest;

/// Raw text frames from an open connection.
pub type FrameStream = BoxStream<'static, Result<String, ChannelError>>;

/// Opens the underlying push connection for a scope.
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn open(&self, scope: &ScopeId) -> Result<FrameStream, ChannelError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// WebSocket transport.
///
/// The scope is passed as the `scopeId` query parameter, and a subscribe
/// frame naming every order-lifecycle event is sent right after the handshake.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: Url,
    bearer_token: Option<String>,
}

impl WebSocketConnector {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            bearer_token: None,
        }
    }

    pub fn parse(url: &str) -> Result<Self, ChannelError> {
        let url = Url::parse(url).map_err(|e| ChannelError::Connect(format!("{url}: {e}")))?;
        Ok(Self::new(url))
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn scoped_url(&self, scope: &ScopeId) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("scopeId", scope.as_str());
        url
    }
}

#[async_trait]
impl ChannelConnector for WebSocketConnector {
    async fn open(&self, scope: &ScopeId) -> Result<FrameStream, ChannelError> {
        let url = self.scoped_url(scope);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ChannelError::Connect(e.to_string()))?;
        if let Some(token) = &self.bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ChannelError::Connect(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (mut ws, response) = connect_async(request).await.map_err(|e| {
            warn!(error = %e, url = %self.url, "Failed to connect live channel");
            ChannelError::Connect(e.to_string())
        })?;
        debug!(status = ?response.status(), scope_id = %scope, "Live channel handshake complete");

        ws.send(Message::Text(subscribe_frame(scope)))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let frames = ws
            .take_while(|msg| future::ready(!matches!(msg, Ok(Message::Close(_)))))
            .filter_map(|msg| {
                future::ready(match msg {
                    Ok(Message::Text(text)) => Some(Ok(text)),
                    Ok(Message::Binary(data)) => String::from_utf8(data).ok().map(Ok),
                    Ok(_) => None,
                    Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
                })
            });

        Ok(frames.boxed())
    }
}

struct ActiveConnection {
    scope: ScopeId,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Everything the reader task needs, detached from the client.
#[derive(Clone)]
struct Ingestor {
    store: SharedNotificationStore,
    audio: Arc<dyn AudioCue>,
    cue_timeout: Duration,
}

impl Ingestor {
    fn handle_frame(&self, frame: &str) {
        let event = match LiveEvent::decode_frame(frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!("Ignoring non-event frame");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Discarding malformed live event");
                return;
            }
        };

        if event.scope_id() != self.store.scope() {
            debug!(
                event_scope = %event.scope_id(),
                scope_id = %self.store.scope(),
                "Dropping live event for another scope"
            );
            return;
        }

        let id = event.id().to_string();
        match self.store.ingest_live_event(event) {
            LiveIngest::Inserted(kind) => {
                debug!(notification_id = %id, kind = %kind, "Live notification ingested");
                if kind.is_audible() {
                    spawn_cue(self.audio.clone(), kind, self.cue_timeout);
                }
            }
            LiveIngest::Duplicate => {
                debug!(notification_id = %id, "Live notification already held");
            }
            LiveIngest::ForeignScope => {
                debug!(notification_id = %id, "Store rejected live event for another scope");
            }
        }
    }
}

pub struct EventChannelClient {
    connector: Arc<dyn ChannelConnector>,
    ingestor: Ingestor,
    status: Arc<watch::Sender<ConnectionStatus>>,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<ActiveConnection>>,
}

impl EventChannelClient {
    pub fn new(
        connector: Arc<dyn ChannelConnector>,
        store: SharedNotificationStore,
        audio: Arc<dyn AudioCue>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            connector,
            ingestor: Ingestor {
                store,
                audio,
                cue_timeout: DEFAULT_CUE_TIMEOUT,
            },
            status: Arc::new(status),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_cue_timeout(mut self, timeout: Duration) -> Self {
        self.ingestor.cue_timeout = timeout;
        self
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Open the channel for `scope_id`.
    ///
    /// Returns `Ok(false)` without doing anything when the scope is absent or
    /// empty (not signed in) or when a live connection for the same scope
    /// already exists. A scope other than the store's is rejected, since its
    /// events would all be filtered out.
    pub async fn connect(&self, scope_id: Option<&str>) -> Result<bool, ChannelError> {
        let Some(scope) = ScopeId::from_optional(scope_id) else {
            debug!("No scope available, live channel not connected");
            return Ok(false);
        };
        let held = self.ingestor.store.scope();
        if scope != *held {
            return Err(ChannelError::ScopeMismatch {
                requested: scope.to_string(),
                held: held.to_string(),
            });
        }

        let mut active = self.active.lock().await;
        if let Some(current) = active.as_ref()
            && current.scope == scope
            && self.status() == ConnectionStatus::Connected
            && !current.task.is_finished()
        {
            trace!(scope_id = %scope, "Live channel already connected");
            return Ok(false);
        }
        if let Some(previous) = active.take() {
            Self::stop(previous).await;
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_replace(ConnectionStatus::Connecting);

        let frames = match self.connector.open(&scope).await {
            Ok(frames) => frames,
            Err(e) => {
                self.status.send_replace(ConnectionStatus::Disconnected);
                return Err(e);
            }
        };

        self.status.send_replace(ConnectionStatus::Connected);
        info!(scope_id = %scope, "Live channel connected");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(pump(
            frames,
            self.ingestor.clone(),
            cancel.clone(),
            self.status.clone(),
            self.generation.clone(),
            generation,
        ));

        *active = Some(ActiveConnection {
            scope,
            cancel,
            task,
        });
        Ok(true)
    }

    /// Close the channel. Safe to call repeatedly or with nothing open.
    pub async fn disconnect(&self) {
        let previous = self.active.lock().await.take();
        if let Some(previous) = previous {
            info!(scope_id = %previous.scope, "Disconnecting live channel");
            Self::stop(previous).await;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(ConnectionStatus::Disconnected);
    }

    async fn stop(connection: ActiveConnection) {
        connection.cancel.cancel();
        if let Err(e) = connection.task.await
            && e.is_panic()
        {
            warn!(scope_id = %connection.scope, "Live channel reader panicked");
        }
    }
}

impl Drop for EventChannelClient {
    fn drop(&mut self) {
        if let Ok(mut active) = self.active.try_lock()
            && let Some(connection) = active.take()
        {
            connection.cancel.cancel();
        }
    }
}

async fn pump(
    mut frames: FrameStream,
    ingestor: Ingestor,
    cancel: CancellationToken,
    status: Arc<watch::Sender<ConnectionStatus>>,
    current_generation: Arc<AtomicU64>,
    generation: u64,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Live channel reader stopped");
                return;
            }
            frame = frames.next() => match frame {
                Some(Ok(text)) => ingestor.handle_frame(&text),
                Some(Err(e)) => {
                    warn!(error = %e, "Live channel dropped; missed events arrive with the next history fetch");
                    break;
                }
                None => {
                    info!("Live channel closed by server; missed events arrive with the next history fetch");
                    break;
                }
            }
        }
    }

    if current_generation.load(Ordering::SeqCst) == generation {
        status.send_replace(ConnectionStatus::Disconnected);
    }
}
