pub mod api;
pub mod audio;
pub mod broadcast;
pub mod channel;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod session;
pub mod shared;
pub mod store;
pub mod types;

pub use api::{HttpNotificationApi, NotificationApi};
pub use audio::{AudioCue, CommandAudioCue, DEFAULT_CUE_TIMEOUT, SilentAudioCue, spawn_cue};
pub use broadcast::{StoreBroadcaster, StoreChange, StoreUpdate};
pub use channel::{
    ChannelConnector, ConnectionStatus, EventChannelClient, FrameStream, WebSocketConnector,
};
pub use error::{ApiError, AudioError, ChannelError, ReconcileError, SessionError};
pub use events::{LiveEvent, subscribe_frame};
pub use reconciler::{DEFAULT_FALLBACK_DELAY, DeleteAllReport, DeleteAllTier, Deleted, Reconciler};
pub use session::{NotificationSession, NotificationSettings, SessionDeps, SessionManager};
pub use shared::SharedNotificationStore;
pub use store::{
    HistoryIngest, LiveIngest, MarkRead, NotificationStore, RecordSource, RemovedRecord,
    StoreSnapshot,
};
pub use types::*;
