//! REST collaborator for notification history and read/delete actions.

use std::time::Duration;

use async_trait::async_trait;
use brandhub_core::ScopeId;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;
use crate::types::{HistoryPage, NotificationRecord};

/// Server endpoints the core depends on.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// `GET notifications?scopeId=..`
    async fn fetch_history(&self, scope: &ScopeId) -> Result<HistoryPage, ApiError>;

    /// `PUT notification/{id}/read`
    async fn mark_read(&self, scope: &ScopeId, id: &str) -> Result<(), ApiError>;

    /// `PUT notifications/mark-all-read`
    async fn mark_all_read(&self, scope: &ScopeId) -> Result<(), ApiError>;

    /// `DELETE notification/{id}`
    async fn delete(&self, scope: &ScopeId, id: &str) -> Result<(), ApiError>;

    /// `DELETE notifications/clear-all`
    async fn clear_all(&self, scope: &ScopeId) -> Result<(), ApiError>;
}

/// History responses come either as a bare list or wrapped with an unread total.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryResponse {
    List(Vec<Value>),
    Envelope {
        notifications: Vec<Value>,
        #[serde(default, rename = "unreadCount", alias = "unread")]
        unread_count: Option<usize>,
    },
}

/// reqwest-backed [`NotificationApi`].
///
/// No request timeout is applied unless one is configured; a hung call then
/// stays pending until the server or the network gives up.
#[derive(Debug, Clone)]
pub struct HttpNotificationApi {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
    request_timeout: Option<Duration>,
}

impl HttpNotificationApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
            bearer_token: None,
            request_timeout: None,
        }
    }

    pub fn parse(base_url: &str) -> Result<Self, ApiError> {
        let url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidEndpoint(format!("{base_url}: {e}")))?;
        Ok(Self::new(url))
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }
        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn scoped_call(
        &self,
        method: Method,
        segments: &[&str],
        scope: &ScopeId,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, scope_id = %scope, "Notification API call");
        let request = self
            .request(method, url)
            .json(&json!({ "scopeId": scope }));
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn fetch_history(&self, scope: &ScopeId) -> Result<HistoryPage, ApiError> {
        let mut url = self.endpoint(&["notifications"])?;
        url.query_pairs_mut().append_pair("scopeId", scope.as_str());

        let response = self.send(self.request(Method::GET, url)).await?;
        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let (raw, unread_total) = match body {
            HistoryResponse::List(raw) => (raw, None),
            HistoryResponse::Envelope {
                notifications,
                unread_count,
            } => (notifications, unread_count),
        };

        Ok(HistoryPage {
            records: decode_records(raw),
            unread_total,
        })
    }

    async fn mark_read(&self, scope: &ScopeId, id: &str) -> Result<(), ApiError> {
        self.scoped_call(Method::PUT, &["notification", id, "read"], scope)
            .await
    }

    async fn mark_all_read(&self, scope: &ScopeId) -> Result<(), ApiError> {
        self.scoped_call(Method::PUT, &["notifications", "mark-all-read"], scope)
            .await
    }

    async fn delete(&self, scope: &ScopeId, id: &str) -> Result<(), ApiError> {
        self.scoped_call(Method::DELETE, &["notification", id], scope)
            .await
    }

    async fn clear_all(&self, scope: &ScopeId) -> Result<(), ApiError> {
        self.scoped_call(Method::DELETE, &["notifications", "clear-all"], scope)
            .await
    }
}

/// Decode history entries one by one so a single malformed record does not
/// hide the rest of the page.
fn decode_records(raw: Vec<Value>) -> Vec<NotificationRecord> {
    raw.into_iter()
        .filter_map(|value| {
            let id = value.get("id").cloned();
            match serde_json::from_value::<NotificationRecord>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(notification_id = ?id, error = %e, "Skipping malformed history record");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_segments() {
        let api = HttpNotificationApi::parse("https://api.example.com/v1/").unwrap();
        let url = api.endpoint(&["notification", "n 1", "read"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/notification/n%201/read"
        );

        let api = HttpNotificationApi::parse("https://api.example.com").unwrap();
        let url = api.endpoint(&["notifications", "clear-all"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/notifications/clear-all");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            HttpNotificationApi::parse("not a url"),
            Err(ApiError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_decode_records_skips_malformed() {
        let raw = vec![
            json!({
                "id": "n1", "scopeId": "brandA", "kind": "order-placed",
                "createdAt": "2024-03-01T09:15:00Z", "orderId": "o-1", "customerName": "Ada"
            }),
            json!({ "id": "n2", "kind": "mystery" }),
        ];
        let records = decode_records(raw);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "n1");
    }

    #[test]
    fn test_history_response_shapes() {
        let list: HistoryResponse = serde_json::from_str("[]").unwrap();
        assert!(matches!(list, HistoryResponse::List(_)));

        let envelope: HistoryResponse =
            serde_json::from_str(r#"{"notifications": [], "unreadCount": 3}"#).unwrap();
        assert!(matches!(
            envelope,
            HistoryResponse::Envelope {
                unread_count: Some(3),
                ..
            }
        ));
    }
}
