//! Shared types, error model, and configuration for chatdesk.
//!
//! This crate is the foundation depended on by all other chatdesk crates.
//! It provides:
//! - [`ChatdeskError`] — the unified error type
//! - Domain types ([`ChatSession`], [`Department`], [`StagedItem`], [`TransferDirective`])
//! - Wire types for the backend API ([`ChatRequest`], [`ChatResponse`], [`ToolResults`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, IngestionConfig, SessionConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_credential,
};
pub use error::{ChatdeskError, Result};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, ChatSession, Department, DepartmentDirectory,
    GENERAL_DEPARTMENT, IngestResult, ScrapeRequest, Sender, SessionId, SessionState, StagedItem,
    StagedKind, ToolResults, TransferDirective, TransferReason,
};
