#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use brandhub_core::ScopeId;
use brandhub_notifications::{
    AudioCue, AudioError, ChannelConnector, ChannelError, FrameStream, NotificationKind,
    StoreUpdate,
};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

pub type FrameSender = mpsc::Sender<Result<String, ChannelError>>;

/// Connector whose connections are fed by the test through mpsc channels.
#[derive(Default)]
pub struct MemoryConnector {
    feeds: Mutex<Vec<(ScopeId, FrameSender)>>,
    opened: AtomicUsize,
    refuse: AtomicBool,
}

impl MemoryConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sender for the most recently opened connection.
    pub fn feed(&self) -> FrameSender {
        self.feeds
            .lock()
            .last()
            .map(|(_, tx)| tx.clone())
            .expect("no connection opened")
    }

    pub fn opened_scopes(&self) -> Vec<String> {
        self.feeds
            .lock()
            .iter()
            .map(|(scope, _)| scope.to_string())
            .collect()
    }

    /// Simulate the server dropping every open connection.
    pub fn drop_connections(&self) {
        self.feeds.lock().clear();
    }
}

#[async_trait]
impl ChannelConnector for MemoryConnector {
    async fn open(&self, scope: &ScopeId) -> Result<FrameStream, ChannelError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Connect("connection refused".into()));
        }
        let (tx, rx) = mpsc::channel(32);
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.feeds.lock().push((scope.clone(), tx));
        Ok(ReceiverStream::new(rx).boxed())
    }
}

/// Audio cue that reports every kind it is asked to play.
pub struct RecordingCue {
    played: mpsc::UnboundedSender<NotificationKind>,
}

impl RecordingCue {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<NotificationKind>) {
        let (played, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { played }), rx)
    }
}

#[async_trait]
impl AudioCue for RecordingCue {
    async fn play(&self, kind: NotificationKind) -> Result<(), AudioError> {
        let _ = self.played.send(kind);
        Ok(())
    }
}

/// Audio cue that always fails.
pub struct BrokenCue;

#[async_trait]
impl AudioCue for BrokenCue {
    async fn play(&self, _kind: NotificationKind) -> Result<(), AudioError> {
        Err(AudioError::Unavailable("no output device".into()))
    }
}

pub fn frame(event: &str, data: Value) -> Result<String, ChannelError> {
    Ok(json!({ "event": event, "data": data }).to_string())
}

pub fn new_order(id: &str, scope: &str) -> Result<String, ChannelError> {
    frame(
        "newOrder",
        json!({
            "id": id,
            "scopeId": scope,
            "orderId": format!("order-{id}"),
            "customerName": "Ada",
            "totalAmount": 42.5,
            "currency": "EUR",
            "createdAt": "2024-03-01T09:15:00Z"
        }),
    )
}

pub fn history_record(id: &str, scope: &str, status: &str) -> Value {
    json!({
        "id": id,
        "scopeId": scope,
        "kind": "order-placed",
        "status": status,
        "createdAt": "2024-03-01T09:15:00Z",
        "orderId": format!("order-{id}"),
        "customerName": "Ada"
    })
}

pub async fn next_update(rx: &mut broadcast::Receiver<StoreUpdate>) -> StoreUpdate {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for store update")
        .expect("store update channel closed")
}
