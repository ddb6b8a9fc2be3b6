//! Core domain types for chatdesk sessions, departments, and ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the reserved catch-all department that always exists.
pub const GENERAL_DEPARTMENT: &str = "GENERAL";

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for visitor session identifiers (time-sortable).
///
/// Fixed for the lifetime of a session and sent with every outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Who authored a message in the session log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// One entry in a session's ordered message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message body as displayed.
    pub text: String,
    /// Author side.
    pub sender: Sender,
    /// When the entry was appended locally.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Build a user-authored entry stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
        }
    }

    /// Build a bot-authored entry stamped now.
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Active-department state of a chat session.
///
/// `Initial` has no prior department context; every other state is keyed by a
/// department name resolved against the [`DepartmentDirectory`], so new
/// departments require no code change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "department")]
pub enum SessionState {
    /// No department chosen yet (nothing transmitted to the backend).
    Initial,
    /// Routed to a named department.
    Department(String),
}

impl SessionState {
    /// Department name to transmit with an outbound message, if any.
    pub fn department_name(&self) -> Option<&str> {
        match self {
            Self::Initial => None,
            Self::Department(name) => Some(name),
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "INITIAL"),
            Self::Department(name) => write!(f, "{name}"),
        }
    }
}

/// An in-memory chat session: identity, routing state, and message log.
///
/// Created when a chat view mounts; never persisted past the process.
#[derive(Debug, Clone)]
pub struct ChatSession {
    /// Opaque token, immutable for the session lifetime.
    pub session_id: SessionId,
    /// Current routing state.
    pub active: SessionState,
    /// Ordered message log (strict append order, no reordering).
    pub log: Vec<ChatMessage>,
}

impl ChatSession {
    /// Start a fresh session with a new id, no department, empty log.
    pub fn new() -> Self {
        Self {
            session_id: SessionId::new(),
            active: SessionState::Initial,
            log: Vec::new(),
        }
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Departments
// ---------------------------------------------------------------------------

/// A routing bucket with its own keywords, fallback response, and knowledge
/// base. Persisted by the backend's department store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    /// Backend-assigned identifier; `None` until first save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Display name, also the routing key (e.g. `SALES`).
    pub name: String,
    /// Comma-delimited routing keywords.
    #[serde(default)]
    pub keywords: String,
    /// Fallback response when no knowledge-base answer applies.
    #[serde(default)]
    pub canned_response: String,
    /// Free text, may embed provenance-marked sections.
    #[serde(default)]
    pub knowledge_base: String,
    /// Where transfer alerts for this department are mailed.
    #[serde(default)]
    pub email_recipient: String,
}

impl Department {
    /// Keywords split on commas, trimmed, empties dropped.
    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// The set of routable departments, sourced from the department store at
/// startup. The reserved `GENERAL` catch-all is always present.
#[derive(Debug, Clone)]
pub struct DepartmentDirectory {
    names: Vec<String>,
}

impl DepartmentDirectory {
    /// Build a directory from a store listing, seeding `GENERAL` first.
    pub fn from_store(departments: &[Department]) -> Self {
        let mut names = vec![GENERAL_DEPARTMENT.to_string()];
        for dept in departments {
            if !names.iter().any(|n| n == &dept.name) {
                names.push(dept.name.clone());
            }
        }
        Self { names }
    }

    /// Whether `name` is a routable department.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// All routable department names, `GENERAL` first.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for DepartmentDirectory {
    fn default() -> Self {
        Self::from_store(&[])
    }
}

// ---------------------------------------------------------------------------
// Staged ingestion items
// ---------------------------------------------------------------------------

/// Where a staged item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedKind {
    /// Scraped from a URL.
    Web,
    /// Extracted from an uploaded document.
    File,
}

/// A pending ingestion result awaiting administrator review.
///
/// Ephemeral: lives only in the staging buffer, cleared on commit or explicit
/// removal. `text` is non-empty by construction — a failed fetch or
/// extraction never enqueues an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedItem {
    /// Producer that created this item.
    pub kind: StagedKind,
    /// Source identifier (URL or file name).
    pub source: String,
    /// Extracted plain text.
    pub text: String,
}

// ---------------------------------------------------------------------------
// Transfer directives
// ---------------------------------------------------------------------------

/// Why a department transfer happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransferReason {
    /// Backend keyword classifier matched the message.
    KeywordMatch,
    /// The visitor picked the department themselves.
    ExplicitSelection,
}

/// An instruction to switch the session's active department.
///
/// Produced once, consumed once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferDirective {
    /// Department to move to.
    pub target: String,
    /// What triggered the move.
    pub reason: TransferReason,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Outbound chat payload: `{text, session_id, current_dept}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    pub session_id: SessionId,
    pub current_dept: String,
}

/// Inbound chat payload. `action == "transfer"` carries a department move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Department context the backend answered under.
    pub department: String,
    /// Reply text to append to the log.
    pub bot_message: String,
    /// `"stay"` or `"transfer"`.
    #[serde(default)]
    pub action: Option<String>,
}

impl ChatResponse {
    /// Extract the transfer directive, if this payload carries one.
    pub fn transfer_directive(&self) -> Option<TransferDirective> {
        match self.action.as_deref() {
            Some("transfer") => Some(TransferDirective {
                target: self.department.clone(),
                reason: TransferReason::KeywordMatch,
            }),
            _ => None,
        }
    }
}

/// Request body for the scrape endpoint: `{urls: [..]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub urls: Vec<String>,
}

/// One `{source, text}` pair returned by the scrape or upload tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    pub source: String,
    pub text: String,
}

/// Envelope for scrape/upload responses: `{results: [..]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResults {
    pub results: Vec<IngestResult>,
}
