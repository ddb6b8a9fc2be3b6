//! HTTP clients for the chatdesk backend API.
//!
//! Two credential modes, matching the backend's split surface:
//! - [`WidgetClient`] — embeddable-chat calls carrying the tenant API key as
//!   an `X-API-Key` header (chat processing, transfer notification).
//! - [`AdminClient`] — dashboard calls carrying an `Authorization: Bearer`
//!   credential (scrape, upload, department CRUD).
//!
//! All calls are non-blocking and map transport failures into the shared
//! error taxonomy: chat traffic to `Channel`, scrape/upload to `Ingestion`,
//! CRUD to `Persistence`. No call retries on its own.

mod admin;
mod widget;

use std::time::Duration;

use chatdesk_shared::{ChatdeskError, Result};

pub use admin::{AdminClient, UploadFile};
pub use widget::WidgetClient;

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("chatdesk/", env!("CARGO_PKG_VERSION"));

/// Default timeout for chat and CRUD requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the tenant API key on widget calls.
const API_KEY_HEADER: &str = "X-API-Key";

/// Build the underlying reqwest client.
///
/// `timeout` is applied as the client-wide default; `None` leaves requests
/// unbounded, which the admin client relies on for scrape/upload calls that
/// have no cancellation protocol.
fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    builder
        .build()
        .map_err(|e| ChatdeskError::channel(format!("failed to build HTTP client: {e}")))
}

/// Join an endpoint path onto the configured base URL.
fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
