//! Department-transfer state machine.
//!
//! States are `Initial` plus one per configured department, data-driven from
//! the department directory; the reserved `GENERAL` catch-all always exists.
//! Transitions never touch the message log — appending greetings and firing
//! audit notifications is the session manager's job.

use tracing::debug;

use chatdesk_shared::{
    ChatdeskError, DepartmentDirectory, GENERAL_DEPARTMENT, Result, SessionState,
    TransferDirective, TransferReason,
};

/// Governs the session's active-department transitions.
#[derive(Debug, Clone)]
pub struct TransferCoordinator {
    state: SessionState,
    directory: DepartmentDirectory,
}

impl TransferCoordinator {
    /// Start in `Initial` over the given department directory.
    pub fn new(directory: DepartmentDirectory) -> Self {
        Self {
            state: SessionState::Initial,
            directory,
        }
    }

    /// Current routing state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The directory of routable departments.
    pub fn directory(&self) -> &DepartmentDirectory {
        &self.directory
    }

    /// Explicit user choice of a department.
    ///
    /// Valid from any state; the target must be a configured department.
    pub fn select_department(&mut self, name: &str) -> Result<TransferDirective> {
        if !self.directory.contains(name) {
            return Err(ChatdeskError::validation(format!(
                "unknown department '{name}'"
            )));
        }
        debug!(from = %self.state, to = name, "explicit department selection");
        self.state = SessionState::Department(name.to_string());
        Ok(TransferDirective {
            target: name.to_string(),
            reason: TransferReason::ExplicitSelection,
        })
    }

    /// Back to the department menu. Local only; no backend notification.
    pub fn reset_to_menu(&mut self) {
        debug!(from = %self.state, "reset to menu");
        self.state = SessionState::Initial;
    }

    /// Apply a backend-issued transfer directive, pre-emptively, from any
    /// current state.
    ///
    /// The backend is the source of truth for automatic routing, so the
    /// target is accepted even if the local directory has not caught up.
    pub fn apply_directive(&mut self, directive: &TransferDirective) {
        debug!(
            from = %self.state,
            to = %directive.target,
            reason = ?directive.reason,
            "applying transfer directive"
        );
        self.state = SessionState::Department(directive.target.clone());
    }

    /// Department context for an outbound message.
    ///
    /// Sending while `Initial` auto-transitions to `GENERAL` *before*
    /// transmission, so the backend classifier never sees an INITIAL context.
    /// Returns the department name to transmit and whether this call
    /// performed the implicit transition.
    pub fn department_for_send(&mut self) -> (String, bool) {
        match &self.state {
            SessionState::Initial => {
                debug!("implicit transition to GENERAL before send");
                self.state = SessionState::Department(GENERAL_DEPARTMENT.to_string());
                (GENERAL_DEPARTMENT.to_string(), true)
            }
            SessionState::Department(name) => (name.clone(), false),
        }
    }
}
