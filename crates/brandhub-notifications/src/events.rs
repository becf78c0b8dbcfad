//! Decoding of live channel frames into typed notification events.
//!
//! The channel delivers JSON text frames in one of two envelopes:
//!
//! ```text
//! {"event": "newOrder", "data": {"id": "n1", "scopeId": "brandA", ...}}
//! ["newOrder", {"id": "n1", "scopeId": "brandA", ...}]
//! ```
//!
//! The array form may carry a numeric packet-type prefix (`42[...]`). The
//! notification kind is taken from the event name, never from the payload.

use brandhub_core::{ScopeId, now_utc, parse_rfc3339};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::ChannelError;
use crate::types::{NotificationKind, NotificationPayload, NotificationRecord, NotificationStatus};

/// Name of the frame the client sends to subscribe to its scope's events.
pub const SUBSCRIBE_EVENT: &str = "subscribe";

/// A notification delivered over the live channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveEvent {
    pub record: NotificationRecord,
    /// False when the server sent no id and the client had to make one up.
    /// Such a record cannot be deleted server-side.
    pub durable: bool,
}

impl LiveEvent {
    /// Wrap an already-typed record, e.g. one re-delivered after appearing in history.
    pub fn from_record(mut record: NotificationRecord) -> Self {
        record.status = NotificationStatus::Unread;
        Self {
            record,
            durable: true,
        }
    }

    pub fn kind(&self) -> NotificationKind {
        self.record.kind()
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn scope_id(&self) -> &ScopeId {
        &self.record.scope_id
    }

    /// Decode a raw text frame. Returns `Ok(None)` for frames that are not
    /// order-lifecycle events (keep-alives, acks, unknown event names).
    pub fn decode_frame(frame: &str) -> Result<Option<LiveEvent>, ChannelError> {
        match split_frame(frame)? {
            Some((name, data)) => Self::from_named(&name, data),
            None => Ok(None),
        }
    }

    /// Build an event from its channel name and payload.
    pub fn from_named(name: &str, data: Value) -> Result<Option<LiveEvent>, ChannelError> {
        let Some(kind) = NotificationKind::from_live_event_name(name) else {
            debug!(event = %name, "Ignoring unsubscribed live event");
            return Ok(None);
        };

        let invalid = |reason: &str| ChannelError::InvalidPayload {
            event: name.to_string(),
            reason: reason.to_string(),
        };

        let Value::Object(ref fields) = data else {
            return Err(invalid("payload is not an object"));
        };

        let scope_id = fields
            .get("scopeId")
            .and_then(Value::as_str)
            .and_then(ScopeId::parse)
            .ok_or_else(|| invalid("missing scopeId"))?;

        let (id, durable) = match fields.get("id").or_else(|| fields.get("_id")) {
            Some(Value::String(s)) if !s.trim().is_empty() => (s.trim().to_string(), true),
            Some(Value::Number(n)) => (n.to_string(), true),
            _ => (local_id(), false),
        };

        let created_at = fields
            .get("createdAt")
            .and_then(Value::as_str)
            .map(received_at_or_parsed)
            .unwrap_or_else(now_utc);

        let payload = NotificationPayload::from_live_data(kind, data)
            .map_err(|e| invalid(&e.to_string()))?;

        Ok(Some(LiveEvent {
            record: NotificationRecord {
                id,
                scope_id,
                status: NotificationStatus::Unread,
                created_at,
                payload,
            },
            durable,
        }))
    }
}

/// Build the frame that subscribes a connection to every order-lifecycle event of `scope`.
pub fn subscribe_frame(scope: &ScopeId) -> String {
    let events: Vec<&str> = NotificationKind::ALL
        .iter()
        .map(NotificationKind::live_event_name)
        .collect();
    json!({
        "event": SUBSCRIBE_EVENT,
        "data": { "scopeId": scope, "events": events }
    })
    .to_string()
}

/// Client-side id for events that arrive without one.
fn local_id() -> String {
    format!("local:{}", uuid::Uuid::new_v4())
}

fn received_at_or_parsed(raw: &str) -> OffsetDateTime {
    match parse_rfc3339(raw) {
        Ok(ts) => ts,
        Err(e) => {
            debug!(error = %e, "Unparseable createdAt on live event, using receipt time");
            now_utc()
        }
    }
}

fn split_frame(frame: &str) -> Result<Option<(String, Value)>, ChannelError> {
    let body = frame.trim().trim_start_matches(|c: char| c.is_ascii_digit());
    if body.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => {
            let mut items = items.into_iter();
            match (items.next(), items.next()) {
                (Some(Value::String(name)), Some(data)) => Ok(Some((name, data))),
                _ => Ok(None),
            }
        }
        Value::Object(mut map) => match (map.remove("event"), map.remove("data")) {
            (Some(Value::String(name)), Some(data)) => Ok(Some((name, data))),
            _ => Ok(None),
        },
        _ => Ok(None),
    }
}
