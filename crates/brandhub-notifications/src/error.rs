use thiserror::Error;

/// Failures talking to the notification REST endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error: status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// True for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            ApiError::Decode(_) | ApiError::InvalidEndpoint(_) => false,
        }
    }
}

/// Failures of the live event channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Channel for scope {requested} requested on a store for scope {held}")]
    ScopeMismatch { requested: String, held: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid {event} payload: {reason}")]
    InvalidPayload { event: String, reason: String },
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::MalformedFrame(e.to_string())
    }
}

/// Failures of the audio-cue collaborator. Never propagated into notification handling.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Audio device unavailable: {0}")]
    Unavailable(String),
}

/// A user action that could not be confirmed by the server
#[derive(Debug, Error)]
#[error("{operation} failed: {source}")]
pub struct ReconcileError {
    pub operation: &'static str,
    pub notification_id: Option<String>,
    #[source]
    pub source: ApiError,
}

impl ReconcileError {
    pub fn new(operation: &'static str, notification_id: Option<&str>, source: ApiError) -> Self {
        Self {
            operation,
            notification_id: notification_id.map(str::to_string),
            source,
        }
    }
}

/// Failures starting a notification session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("History fetch failed: {0}")]
    History(#[from] ApiError),

    #[error("Live channel failed: {0}")]
    Channel(#[from] ChannelError),
}
