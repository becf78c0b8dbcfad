use brandhub_core::ScopeId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Reason attached to request-type notifications whose payload carries none.
pub const DEFAULT_REASON: &str = "No reason provided";

fn default_reason() -> String {
    DEFAULT_REASON.to_string()
}

/// Order-lifecycle notification kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    OrderPlaced,
    CancellationRequested,
    CancellationApproved,
    CancellationRejected,
    RefundRequested,
    RefundApproved,
    RefundRejected,
}

impl NotificationKind {
    /// Every kind the live channel subscribes to.
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::OrderPlaced,
        NotificationKind::CancellationRequested,
        NotificationKind::CancellationApproved,
        NotificationKind::CancellationRejected,
        NotificationKind::RefundRequested,
        NotificationKind::RefundApproved,
        NotificationKind::RefundRejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderPlaced => "order-placed",
            NotificationKind::CancellationRequested => "cancellation-requested",
            NotificationKind::CancellationApproved => "cancellation-approved",
            NotificationKind::CancellationRejected => "cancellation-rejected",
            NotificationKind::RefundRequested => "refund-requested",
            NotificationKind::RefundApproved => "refund-approved",
            NotificationKind::RefundRejected => "refund-rejected",
        }
    }

    /// Name of the live channel event that carries this kind.
    pub fn live_event_name(&self) -> &'static str {
        match self {
            NotificationKind::OrderPlaced => "newOrder",
            NotificationKind::CancellationRequested => "cancellationRequested",
            NotificationKind::CancellationApproved => "cancellationApproved",
            NotificationKind::CancellationRejected => "cancellationRejected",
            NotificationKind::RefundRequested => "refundRequested",
            NotificationKind::RefundApproved => "refundApproved",
            NotificationKind::RefundRejected => "refundRejected",
        }
    }

    pub fn from_live_event_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.live_event_name() == name)
    }

    /// Kinds that need the brand's attention and trigger an audio cue.
    pub fn is_audible(&self) -> bool {
        matches!(
            self,
            NotificationKind::OrderPlaced
                | NotificationKind::CancellationRequested
                | NotificationKind::RefundRequested
        )
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read state of a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    #[default]
    Unread,
    Read,
}

impl NotificationStatus {
    pub fn is_unread(&self) -> bool {
        matches!(self, NotificationStatus::Unread)
    }

    /// Combine two observations of the same record. `Read` is terminal, so it wins.
    pub fn merge(self, other: NotificationStatus) -> NotificationStatus {
        if self == NotificationStatus::Read || other == NotificationStatus::Read {
            NotificationStatus::Read
        } else {
            NotificationStatus::Unread
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequested {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default = "default_reason")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationDecision {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequested {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default = "default_reason")]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundApproved {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRejected {
    pub order_id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Kind-specific notification data, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NotificationPayload {
    OrderPlaced(OrderPlaced),
    CancellationRequested(CancellationRequested),
    CancellationApproved(CancellationDecision),
    CancellationRejected(CancellationDecision),
    RefundRequested(RefundRequested),
    RefundApproved(RefundApproved),
    RefundRejected(RefundRejected),
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::OrderPlaced(_) => NotificationKind::OrderPlaced,
            NotificationPayload::CancellationRequested(_) => NotificationKind::CancellationRequested,
            NotificationPayload::CancellationApproved(_) => NotificationKind::CancellationApproved,
            NotificationPayload::CancellationRejected(_) => NotificationKind::CancellationRejected,
            NotificationPayload::RefundRequested(_) => NotificationKind::RefundRequested,
            NotificationPayload::RefundApproved(_) => NotificationKind::RefundApproved,
            NotificationPayload::RefundRejected(_) => NotificationKind::RefundRejected,
        }
    }

    pub fn order_id(&self) -> &str {
        match self {
            NotificationPayload::OrderPlaced(p) => &p.order_id,
            NotificationPayload::CancellationRequested(p) => &p.order_id,
            NotificationPayload::CancellationApproved(p)
            | NotificationPayload::CancellationRejected(p) => &p.order_id,
            NotificationPayload::RefundRequested(p) => &p.order_id,
            NotificationPayload::RefundApproved(p) => &p.order_id,
            NotificationPayload::RefundRejected(p) => &p.order_id,
        }
    }

    pub fn customer_name(&self) -> &str {
        match self {
            NotificationPayload::OrderPlaced(p) => &p.customer_name,
            NotificationPayload::CancellationRequested(p) => &p.customer_name,
            NotificationPayload::CancellationApproved(p)
            | NotificationPayload::CancellationRejected(p) => &p.customer_name,
            NotificationPayload::RefundRequested(p) => &p.customer_name,
            NotificationPayload::RefundApproved(p) => &p.customer_name,
            NotificationPayload::RefundRejected(p) => &p.customer_name,
        }
    }

    /// Decode the kind-specific fields of a live event whose kind is known
    /// from the event name. Unrelated fields in `data` are ignored.
    pub fn from_live_data(
        kind: NotificationKind,
        data: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        let mut payload = match kind {
            NotificationKind::OrderPlaced => Self::OrderPlaced(serde_json::from_value(data)?),
            NotificationKind::CancellationRequested => {
                Self::CancellationRequested(serde_json::from_value(data)?)
            }
            NotificationKind::CancellationApproved => {
                Self::CancellationApproved(serde_json::from_value(data)?)
            }
            NotificationKind::CancellationRejected => {
                Self::CancellationRejected(serde_json::from_value(data)?)
            }
            NotificationKind::RefundRequested => {
                Self::RefundRequested(serde_json::from_value(data)?)
            }
            NotificationKind::RefundApproved => Self::RefundApproved(serde_json::from_value(data)?),
            NotificationKind::RefundRejected => Self::RefundRejected(serde_json::from_value(data)?),
        };
        payload.fill_default_reason();
        Ok(payload)
    }

    /// Blank reasons on request kinds are replaced with [`DEFAULT_REASON`].
    fn fill_default_reason(&mut self) {
        let reason = match self {
            NotificationPayload::CancellationRequested(p) => &mut p.reason,
            NotificationPayload::RefundRequested(p) => &mut p.reason,
            _ => return,
        };
        if reason.trim().is_empty() {
            *reason = default_reason();
        }
    }

    /// One-line human readable description.
    pub fn summary(&self) -> String {
        match self {
            NotificationPayload::OrderPlaced(p) => match p.total_amount {
                Some(total) => format!(
                    "New order {} from {} ({:.2}{})",
                    p.order_id,
                    p.customer_name,
                    total,
                    p.currency
                        .as_deref()
                        .map(|c| format!(" {c}"))
                        .unwrap_or_default()
                ),
                None => format!("New order {} from {}", p.order_id, p.customer_name),
            },
            NotificationPayload::CancellationRequested(p) => format!(
                "{} requested cancellation of order {}: {}",
                p.customer_name, p.order_id, p.reason
            ),
            NotificationPayload::CancellationApproved(p) => {
                format!("Cancellation of order {} approved", p.order_id)
            }
            NotificationPayload::CancellationRejected(p) => {
                format!("Cancellation of order {} rejected", p.order_id)
            }
            NotificationPayload::RefundRequested(p) => format!(
                "{} requested a refund for order {}: {}",
                p.customer_name, p.order_id, p.reason
            ),
            NotificationPayload::RefundApproved(p) => {
                format!("Refund for order {} approved", p.order_id)
            }
            NotificationPayload::RefundRejected(p) => {
                format!("Refund for order {} rejected", p.order_id)
            }
        }
    }
}

/// A single notification as held by the store and returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: String,
    pub scope_id: ScopeId,
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(flatten)]
    pub payload: NotificationPayload,
}

impl NotificationRecord {
    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }

    pub fn is_unread(&self) -> bool {
        self.status.is_unread()
    }
}

/// One fetch of the notification history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPage {
    /// Records in server order, newest first
    pub records: Vec<NotificationRecord>,
    /// Server-side unread total for the scope, which may cover records
    /// outside this page
    pub unread_total: Option<usize>,
}

impl HistoryPage {
    pub fn new(records: Vec<NotificationRecord>) -> Self {
        Self {
            records,
            unread_total: None,
        }
    }

    pub fn with_unread_total(mut self, unread_total: usize) -> Self {
        self.unread_total = Some(unread_total);
        self
    }
}
