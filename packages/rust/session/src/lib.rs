//! Chat session management: message exchange and department routing.
//!
//! The [`SessionManager`] owns a visitor's session identity, the ordered
//! message log, and a [`TransferCoordinator`] governing the active
//! department. It speaks to the backend through a [`ChatTransport`], appends
//! bot replies strictly in arrival order, and degrades channel failures into
//! a single fixed apology entry — the session itself never dies.

mod coordinator;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use chatdesk_shared::{
    ChatMessage, ChatRequest, ChatSession, ChatdeskError, DepartmentDirectory, Result,
    SessionState,
};

pub use coordinator::TransferCoordinator;
pub use transport::ChatTransport;

/// Fixed bot entry appended when the channel fails. The next send attempts a
/// fresh transmission; nothing is retried automatically.
pub const CONNECTION_TROUBLE_MESSAGE: &str =
    "We're having connection trouble right now. Please try sending that again in a moment.";

/// Render the fixed greeting for an explicitly selected department.
fn greeting_for(department: &str) -> String {
    format!("You're now chatting with our {department} team. How can we help?")
}

/// Owns one visitor session end to end: identity, log, routing, channel.
pub struct SessionManager {
    transport: Option<Arc<dyn ChatTransport>>,
    coordinator: TransferCoordinator,
    session: ChatSession,
    greeting_delay: Duration,
}

impl SessionManager {
    /// Establish the session channel (view mount).
    ///
    /// A fresh session id is minted here and accompanies every outbound
    /// message for the session's lifetime.
    pub fn connect(
        transport: Arc<dyn ChatTransport>,
        directory: DepartmentDirectory,
        greeting_delay: Duration,
    ) -> Self {
        let session = ChatSession::new();
        info!(session_id = %session.session_id, "session channel established");
        Self {
            transport: Some(transport),
            coordinator: TransferCoordinator::new(directory),
            session,
            greeting_delay,
        }
    }

    /// Release the channel (view teardown). Idempotent.
    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!(session_id = %self.session.session_id, "session channel released");
        }
    }

    /// The session snapshot: id, routing state, message log.
    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Ordered message log.
    pub fn log(&self) -> &[ChatMessage] {
        &self.session.log
    }

    /// Current routing state.
    pub fn state(&self) -> &SessionState {
        self.coordinator.state()
    }

    /// The directory of routable departments.
    pub fn directory(&self) -> &DepartmentDirectory {
        self.coordinator.directory()
    }

    /// Send one visitor message.
    ///
    /// Appends the user entry optimistically, transmits
    /// `{text, session_id, current_dept}`, and on reply applies any transfer
    /// directive *before* appending the bot entry. A channel failure appends
    /// the fixed apology entry instead and leaves the session usable; only
    /// sending on a closed session is an error.
    #[instrument(skip_all, fields(session_id = %self.session.session_id))]
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| ChatdeskError::channel("session is closed"))?;

        // Never transmit an INITIAL context; fall into GENERAL first.
        let (current_dept, transitioned) = self.coordinator.department_for_send();
        if transitioned {
            self.fire_audit(&current_dept);
        }

        self.session.log.push(ChatMessage::user(text));

        let request = ChatRequest {
            text: text.to_string(),
            session_id: self.session.session_id.clone(),
            current_dept,
        };

        match transport.process_chat(&request).await {
            Ok(reply) => {
                if let Some(directive) = reply.transfer_directive() {
                    self.coordinator.apply_directive(&directive);
                    self.fire_audit(&directive.target);
                }
                self.session.log.push(ChatMessage::bot(&reply.bot_message));
            }
            Err(e) => {
                warn!(error = %e, "channel failure, degrading to apology entry");
                self.session
                    .log
                    .push(ChatMessage::bot(CONNECTION_TROUBLE_MESSAGE));
            }
        }

        self.session.active = self.coordinator.state().clone();
        Ok(())
    }

    /// Explicitly route the session to a department.
    ///
    /// Appends the fixed per-department greeting after the configured pacing
    /// delay and fires the audit notification; neither blocks the transition
    /// itself.
    #[instrument(skip(self), fields(session_id = %self.session.session_id))]
    pub async fn select_department(&mut self, name: &str) -> Result<()> {
        let directive = self.coordinator.select_department(name)?;
        self.session.active = self.coordinator.state().clone();
        self.fire_audit(&directive.target);

        // Simulated pacing before the greeting lands.
        if !self.greeting_delay.is_zero() {
            tokio::time::sleep(self.greeting_delay).await;
        }
        self.session
            .log
            .push(ChatMessage::bot(greeting_for(&directive.target)));
        Ok(())
    }

    /// Return to the department menu. Local only; the backend is not told.
    pub fn reset_to_menu(&mut self) {
        self.coordinator.reset_to_menu();
        self.session.active = SessionState::Initial;
    }

    /// Fire the best-effort audit notification for a transition into a named
    /// department, as a detached task. Failure is logged and never blocks or
    /// reverts the transition.
    fn fire_audit(&self, department: &str) {
        let Some(transport) = self.transport.clone() else {
            return;
        };
        let session_id = self.session.session_id.clone();
        let department = department.to_string();
        tokio::spawn(async move {
            if let Err(e) = transport.notify_transfer(&department, &session_id).await {
                warn!(
                    error = %e,
                    department = %department,
                    session_id = %session_id,
                    "transfer audit notification failed"
                );
            }
        });
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        // Deterministic channel release even if close() was never called.
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chatdesk_shared::{ChatResponse, Department, Sender, SessionId};

    /// Scripted backend: pops one canned outcome per send, records traffic.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<Vec<Result<ChatResponse>>>,
        sent: Mutex<Vec<ChatRequest>>,
        audits: Mutex<Vec<String>>,
        fail_audits: bool,
    }

    impl ScriptedTransport {
        fn reply(department: &str, message: &str, action: Option<&str>) -> Result<ChatResponse> {
            Ok(ChatResponse {
                department: department.into(),
                bot_message: message.into(),
                action: action.map(String::from),
            })
        }

        fn push(&self, outcome: Result<ChatResponse>) {
            // Scripted in send order; pop from the front.
            self.replies.lock().unwrap().push(outcome);
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn process_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.sent.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Self::reply(&request.current_dept, "I'm listening...", Some("stay"))
            } else {
                replies.remove(0)
            }
        }

        async fn notify_transfer(&self, target: &str, _session_id: &SessionId) -> Result<()> {
            self.audits.lock().unwrap().push(target.to_string());
            if self.fail_audits {
                Err(ChatdeskError::channel("audit endpoint down"))
            } else {
                Ok(())
            }
        }
    }

    fn directory() -> DepartmentDirectory {
        let dept = |name: &str| Department {
            id: None,
            name: name.into(),
            keywords: String::new(),
            canned_response: String::new(),
            knowledge_base: String::new(),
            email_recipient: String::new(),
        };
        DepartmentDirectory::from_store(&[dept("SALES"), dept("SUPPORT")])
    }

    fn manager(transport: Arc<ScriptedTransport>) -> SessionManager {
        SessionManager::connect(transport, directory(), Duration::ZERO)
    }

    #[tokio::test]
    async fn n_sends_append_2n_entries_in_order() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());

        for i in 0..3 {
            mgr.send_message(&format!("message {i}")).await.expect("send");
        }

        let log = mgr.log();
        assert_eq!(log.len(), 6);
        for (i, pair) in log.chunks(2).enumerate() {
            assert_eq!(pair[0].sender, Sender::User);
            assert_eq!(pair[0].text, format!("message {i}"));
            assert_eq!(pair[1].sender, Sender::Bot);
        }
    }

    #[tokio::test]
    async fn initial_send_transmits_general_and_stays_there() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());
        assert_eq!(mgr.state(), &SessionState::Initial);

        mgr.send_message("hello").await.expect("send");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].current_dept, "GENERAL");
        drop(sent);
        assert_eq!(mgr.state(), &SessionState::Department("GENERAL".into()));
    }

    #[tokio::test]
    async fn session_id_is_fixed_across_sends() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());

        mgr.send_message("one").await.expect("send");
        mgr.send_message("two").await.expect("send");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].session_id, sent[1].session_id);
        assert_eq!(sent[0].session_id, mgr.session().session_id);
    }

    #[tokio::test]
    async fn transfer_directive_moves_state_before_bot_entry() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(ScriptedTransport::reply(
            "SUPPORT",
            "I see this is about SUPPORT.",
            Some("transfer"),
        ));
        let mut mgr = manager(transport.clone());

        mgr.send_message("my app crashed").await.expect("send");

        assert_eq!(mgr.state(), &SessionState::Department("SUPPORT".into()));
        // Log untouched by the transfer itself: exactly user + bot
        assert_eq!(mgr.log().len(), 2);
        assert_eq!(mgr.log()[1].text, "I see this is about SUPPORT.");
    }

    #[tokio::test]
    async fn directive_applies_preemptively_from_any_state() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());
        mgr.select_department("SALES").await.expect("select");
        let log_len = mgr.log().len();

        transport.push(ScriptedTransport::reply(
            "SUPPORT",
            "Routing you to tech support.",
            Some("transfer"),
        ));
        mgr.send_message("actually it crashes").await.expect("send");

        assert_eq!(mgr.state(), &SessionState::Department("SUPPORT".into()));
        assert_eq!(mgr.log().len(), log_len + 2);
    }

    #[tokio::test]
    async fn channel_failure_degrades_to_apology_and_session_survives() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Err(ChatdeskError::channel("connection reset")));
        let mut mgr = manager(transport.clone());

        mgr.send_message("hello?").await.expect("send is not fatal");

        let log = mgr.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[1].text, CONNECTION_TROUBLE_MESSAGE);
        assert_eq!(log[1].sender, Sender::Bot);

        // Next send attempts a fresh transmission and succeeds
        mgr.send_message("still there?").await.expect("send");
        assert_eq!(mgr.log().len(), 4);
        assert_ne!(mgr.log()[3].text, CONNECTION_TROUBLE_MESSAGE);
    }

    #[tokio::test]
    async fn explicit_selection_appends_greeting() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());

        mgr.select_department("SALES").await.expect("select");

        assert_eq!(mgr.state(), &SessionState::Department("SALES".into()));
        let log = mgr.log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sender, Sender::Bot);
        assert!(log[0].text.contains("SALES"));
    }

    #[tokio::test]
    async fn automatic_transfer_synthesizes_no_greeting() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(ScriptedTransport::reply(
            "SUPPORT",
            "Flagged for tech support.",
            Some("transfer"),
        ));
        let mut mgr = manager(transport.clone());

        mgr.send_message("error on login").await.expect("send");

        // Exactly user + bot reply; no synthetic greeting entry
        assert_eq!(mgr.log().len(), 2);
    }

    #[tokio::test]
    async fn reset_to_menu_is_local_only() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());
        mgr.select_department("SALES").await.expect("select");
        tokio::task::yield_now().await;
        let audits_before = transport.audits.lock().unwrap().len();

        mgr.reset_to_menu();
        tokio::task::yield_now().await;

        assert_eq!(mgr.state(), &SessionState::Initial);
        assert_eq!(transport.audits.lock().unwrap().len(), audits_before);
    }

    #[tokio::test]
    async fn transitions_fire_audit_notifications() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());

        mgr.select_department("SALES").await.expect("select");
        // Detached task; give it a chance to run
        tokio::task::yield_now().await;

        let audits = transport.audits.lock().unwrap().clone();
        assert_eq!(audits, vec!["SALES"]);
    }

    #[tokio::test]
    async fn audit_failure_never_reverts_the_transition() {
        let transport = Arc::new(ScriptedTransport {
            fail_audits: true,
            ..Default::default()
        });
        let mut mgr = manager(transport.clone());

        mgr.select_department("SUPPORT").await.expect("select");
        tokio::task::yield_now().await;

        assert_eq!(mgr.state(), &SessionState::Department("SUPPORT".into()));
        assert!(!transport.audits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sending_on_closed_session_is_an_error() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());
        mgr.close();

        let err = mgr.send_message("anyone?").await.unwrap_err();
        assert!(matches!(err, ChatdeskError::Channel(_)));
        assert!(mgr.log().is_empty());
    }

    #[tokio::test]
    async fn selecting_unknown_department_fails_cleanly() {
        let transport = Arc::new(ScriptedTransport::default());
        let mut mgr = manager(transport.clone());
        assert!(mgr.select_department("LEGAL").await.is_err());
        assert_eq!(mgr.state(), &SessionState::Initial);
        assert!(mgr.log().is_empty());
    }
}
