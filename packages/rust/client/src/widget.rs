//! Widget-side client: chat processing and transfer notification.

use std::time::Duration;

use tracing::{debug, instrument};

use chatdesk_shared::{ChatRequest, ChatResponse, ChatdeskError, Result, SessionId};

use crate::{API_KEY_HEADER, DEFAULT_TIMEOUT_SECS, build_http_client, endpoint};

/// Client for the embeddable-chat surface of the backend.
///
/// Carries the tenant API key on every request; the key decides which
/// department set and knowledge base the session belongs to.
#[derive(Debug, Clone)]
pub struct WidgetClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WidgetClient {
    /// Create a widget client against `base_url` with the given tenant key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let http = build_http_client(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Send one message for processing and await the backend's reply.
    ///
    /// Request: `{text, session_id, current_dept}` → response
    /// `{department, bot_message, action?}`. Any transport or status failure
    /// surfaces as a channel error; the caller decides how to degrade.
    #[instrument(skip_all, fields(session_id = %request.session_id, dept = %request.current_dept))]
    pub async fn process_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = endpoint(&self.base_url, "chat/process");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatdeskError::channel(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatdeskError::channel(format!("{url}: HTTP {status}")));
        }

        let payload: ChatResponse = response
            .json()
            .await
            .map_err(|e| ChatdeskError::channel(format!("{url}: malformed reply: {e}")))?;

        debug!(
            department = %payload.department,
            action = payload.action.as_deref().unwrap_or("stay"),
            "chat reply received"
        );

        Ok(payload)
    }

    /// Notify the backend that the session moved to `target` department.
    ///
    /// Query-parameter call; the response body is not consumed. Callers treat
    /// this as best-effort and must never block a transition on it.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn notify_transfer(&self, target: &str, session_id: &SessionId) -> Result<()> {
        let url = endpoint(&self.base_url, "chat/transfer");

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[
                ("target_dept", target),
                ("session_id", &session_id.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ChatdeskError::channel(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatdeskError::channel(format!("{url}: HTTP {status}")));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn process_chat_round_trip() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/process"))
            .and(header("X-API-Key", "DEMO_KEY"))
            .and(body_partial_json(serde_json::json!({
                "text": "my app crashed",
                "current_dept": "GENERAL",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "department": "SUPPORT",
                "bot_message": "I see this is about SUPPORT.",
                "action": "transfer",
            })))
            .mount(&server)
            .await;

        let client =
            WidgetClient::new(format!("{}/api", server.uri()), "DEMO_KEY").expect("client");

        let reply = client
            .process_chat(&ChatRequest {
                text: "my app crashed".into(),
                session_id: SessionId::new(),
                current_dept: "GENERAL".into(),
            })
            .await
            .expect("chat reply");

        assert_eq!(reply.department, "SUPPORT");
        assert_eq!(reply.action.as_deref(), Some("transfer"));
    }

    #[tokio::test]
    async fn process_chat_maps_failure_to_channel_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/process"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = WidgetClient::new(format!("{}/api", server.uri()), "k").expect("client");

        let err = client
            .process_chat(&ChatRequest {
                text: "hello".into(),
                session_id: SessionId::new(),
                current_dept: "GENERAL".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ChatdeskError::Channel(_)));
    }

    #[tokio::test]
    async fn notify_transfer_sends_query_params_and_key_header() {
        let server = MockServer::start().await;
        let session_id = SessionId::new();

        Mock::given(method("POST"))
            .and(path("/api/chat/transfer"))
            .and(header("X-API-Key", "DEMO_KEY"))
            .and(query_param("target_dept", "BILLING"))
            .and(query_param("session_id", session_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "ok",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            WidgetClient::new(format!("{}/api", server.uri()), "DEMO_KEY").expect("client");

        client
            .notify_transfer("BILLING", &session_id)
            .await
            .expect("notify");
    }

    #[tokio::test]
    async fn notify_transfer_surfaces_rejection() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/chat/transfer"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = WidgetClient::new(format!("{}/api", server.uri()), "bad").expect("client");

        let err = client
            .notify_transfer("SALES", &SessionId::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }
}
