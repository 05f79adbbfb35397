//! Webhook delivery: POSTs one message to the configured endpoint and
//! resolves the remote delivery identifier.

use async_trait::async_trait;
use courier_core::config::WebhookConfig;
use courier_core::error::{CourierError, DeliveryError, Result};
use courier_core::traits::DeliveryClient;
use courier_core::types::{Deadline, Message};
use serde::{Deserialize, Serialize};

/// Header carrying the optional webhook auth key.
pub const AUTH_HEADER: &str = "x-ins-auth-key";

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct WebhookRequest<'a> {
    to: &'a str,
    content: &'a str,
}

/// Only the id is read; the accompanying `message` text is ignored.
#[derive(Debug, Deserialize)]
struct WebhookResponse {
    #[serde(default, rename = "messageId")]
    message_id: Option<String>,
}

/// HTTP webhook delivery client.
pub struct WebhookClient {
    url: String,
    auth_key: Option<String>,
    placeholder_ids: Vec<String>,
    client: reqwest::Client,
}

impl WebhookClient {
    /// Build a client from config; the transport timeout is the delivery timeout.
    pub fn from_config(config: &WebhookConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.delivery_timeout())
            .build()
            .map_err(|e| CourierError::Config(format!("HTTP client: {e}")))?;
        if config.url.is_empty() {
            tracing::warn!("⚠️ Webhook URL is empty; every delivery will fail");
        }
        Ok(Self {
            url: config.url.clone(),
            auth_key: config.auth_key.clone().filter(|k| !k.is_empty()),
            placeholder_ids: config.placeholder_ids.clone(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, message: &Message) -> std::result::Result<String, DeliveryError> {
        let body = serde_json::to_vec(&WebhookRequest {
            to: &message.to,
            content: &message.content,
        })
        .map_err(|e| DeliveryError::Serialize(e.to_string()))?;

        let mut req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(key) = &self.auth_key {
            req = req.header(AUTH_HEADER, key.as_str());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let parsed: WebhookResponse = serde_json::from_slice(&bytes).map_err(|e| {
            DeliveryError::Body(format!(
                "{e} (status {}): {}",
                status.as_u16(),
                excerpt(&String::from_utf8_lossy(&bytes))
            ))
        })?;

        Ok(self.resolve_id(parsed.message_id))
    }

    /// Remote id if usable, otherwise a freshly generated UUID v4.
    fn resolve_id(&self, remote: Option<String>) -> String {
        match remote {
            Some(id) if !id.is_empty() && !self.placeholder_ids.iter().any(|p| *p == id) => id,
            _ => uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl DeliveryClient for WebhookClient {
    async fn send(
        &self,
        message: &Message,
        deadline: Deadline,
    ) -> std::result::Result<String, DeliveryError> {
        tokio::time::timeout_at(deadline.instant(), self.post(message))
            .await
            .map_err(|_| DeliveryError::Timeout)?
    }
}

fn excerpt(body: &str) -> String {
    if body.chars().count() > BODY_EXCERPT_CHARS {
        let cut: String = body.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Spawn a local webhook endpoint returning `status` and `body`.
    async fn spawn_endpoint(
        status: StatusCode,
        body: &'static str,
        delay: Duration,
    ) -> (String, Arc<Mutex<Vec<(HeaderMap, serde_json::Value)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let app = Router::new().route(
            "/hook",
            post(move |headers: HeaderMap, payload: axum::Json<serde_json::Value>| {
                let seen = seen_clone.clone();
                async move {
                    seen.lock().unwrap().push((headers, payload.0));
                    tokio::time::sleep(delay).await;
                    (status, body)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        (format!("http://{addr}/hook"), seen)
    }

    fn client_for(url: &str, auth_key: Option<&str>) -> WebhookClient {
        WebhookClient::from_config(&WebhookConfig {
            url: url.to_string(),
            auth_key: auth_key.map(String::from),
            ..WebhookConfig::default()
        })
        .unwrap()
    }

    fn message(content: &str) -> Message {
        let now = Utc::now();
        Message {
            id: 1,
            to: "+905551111111".into(),
            content: content.into(),
            sent: false,
            sent_at: None,
            delivery_id: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn assert_uuid_v4(id: &str) {
        assert_eq!(id.len(), 36);
        let parts: Vec<&str> = id.split('-').collect();
        let lens: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![8, 4, 4, 4, 12]);
        assert!(parts[2].starts_with('4'), "version nibble must be 4: {id}");
        assert!(
            matches!(parts[3].chars().next(), Some('8' | '9' | 'a' | 'b')),
            "variant bits must be 10xx: {id}"
        );
    }

    #[tokio::test]
    async fn test_send_returns_remote_id_and_posts_payload() {
        let (url, seen) = spawn_endpoint(
            StatusCode::ACCEPTED,
            r#"{"message":"Accepted","messageId":"67f2f8a8-ea58-4ed0-a6f9-ff217df4d849"}"#,
            Duration::ZERO,
        )
        .await;
        let client = client_for(&url, Some("secret"));

        let id = client.send(&message("hi there"), deadline()).await.unwrap();
        assert_eq!(id, "67f2f8a8-ea58-4ed0-a6f9-ff217df4d849");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (headers, payload) = &seen[0];
        assert_eq!(payload["to"], "+905551111111");
        assert_eq!(payload["content"], "hi there");
        assert_eq!(headers.get(AUTH_HEADER).unwrap(), "secret");
    }

    #[tokio::test]
    async fn test_empty_id_is_synthesized() {
        let (url, _) = spawn_endpoint(
            StatusCode::OK,
            r#"{"message":"Accepted","messageId":""}"#,
            Duration::ZERO,
        )
        .await;
        let client = client_for(&url, None);
        let id = client.send(&message("x"), deadline()).await.unwrap();
        assert_uuid_v4(&id);
    }

    #[tokio::test]
    async fn test_placeholder_and_missing_ids_are_synthesized() {
        let (url, seen) = spawn_endpoint(
            StatusCode::OK,
            r#"{"message":"Accepted","messageId":"{{uuid}}"}"#,
            Duration::ZERO,
        )
        .await;
        let client = client_for(&url, None);
        let id = client.send(&message("x"), deadline()).await.unwrap();
        assert_ne!(id, "{{uuid}}");
        assert_uuid_v4(&id);
        assert!(seen.lock().unwrap()[0].0.get(AUTH_HEADER).is_none());

        let body = r#"{"message":"Accepted"}"#;
        let (url, _) = spawn_endpoint(StatusCode::OK, body, Duration::ZERO).await;
        let client = client_for(&url, None);
        let id = client.send(&message("x"), deadline()).await.unwrap();
        assert_uuid_v4(&id);
    }

    #[tokio::test]
    async fn test_non_2xx_is_status_error() {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let (url, _) = spawn_endpoint(status, "boom", Duration::ZERO).await;
        let client = client_for(&url, None);
        let err = client.send(&message("x"), deadline()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(500)));
    }

    #[tokio::test]
    async fn test_unparseable_body_is_body_error() {
        let (url, _) = spawn_endpoint(StatusCode::OK, "not json at all", Duration::ZERO).await;
        let client = client_for(&url, None);
        let err = client.send(&message("x"), deadline()).await.unwrap_err();
        match err {
            DeliveryError::Body(detail) => assert!(detail.contains("not json at all")),
            other => panic!("expected body error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_delivery() {
        let delay = Duration::from_secs(2);
        let (url, _) = spawn_endpoint(StatusCode::OK, r#"{"messageId":"late"}"#, delay).await;
        let err = client_for(&url, None)
            .send(&message("x"), Deadline::after(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Timeout));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = client_for(&format!("http://{addr}/hook"), None)
            .send(&message("x"), deadline())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        let long = "x".repeat(500);
        let cut = excerpt(&long);
        assert_eq!(cut.len(), BODY_EXCERPT_CHARS + 3);
        assert!(cut.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
