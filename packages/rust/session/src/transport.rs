//! Transport seam between the session manager and the backend channel.

use async_trait::async_trait;

use chatdesk_client::WidgetClient;
use chatdesk_shared::{ChatRequest, ChatResponse, Result, SessionId};

/// The session's view of the backend channel.
///
/// A trait so tests can run a session against a scripted backend; production
/// uses [`WidgetClient`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transmit one message and await the reply.
    async fn process_chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Best-effort audit notification of a department transition.
    async fn notify_transfer(&self, target: &str, session_id: &SessionId) -> Result<()>;
}

#[async_trait]
impl ChatTransport for WidgetClient {
    async fn process_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        WidgetClient::process_chat(self, request).await
    }

    async fn notify_transfer(&self, target: &str, session_id: &SessionId) -> Result<()> {
        WidgetClient::notify_transfer(self, target, session_id).await
    }
}
