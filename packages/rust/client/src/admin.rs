//! Admin-side client: ingestion tools and department CRUD.

use std::time::Duration;

use tracing::{debug, info, instrument};

use chatdesk_shared::{
    ChatdeskError, Department, IngestResult, Result, ScrapeRequest, ToolResults,
};

use crate::{build_http_client, endpoint};

/// A file handed to the upload endpoint: display name plus raw bytes.
///
/// Text extraction happens behind the endpoint; we never look inside.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// File name shown as the item's source.
    pub name: String,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

/// Client for the dashboard surface of the backend.
///
/// Carries the administrator bearer token on every request. Scrape and
/// upload calls run with no timeout unless one is configured — the backend
/// offers no cancellation protocol, so a bound here would abandon work the
/// server keeps doing.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
    /// Optional bound on scrape/upload calls, from `[ingestion] timeout_secs`.
    tool_timeout: Option<Duration>,
}

impl AdminClient {
    /// Create an admin client against `base_url` with the given bearer token.
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: impl Into<String>,
        tool_timeout: Option<Duration>,
    ) -> Result<Self> {
        // No client-wide timeout: CRUD calls set one per request, tool calls
        // stay unbounded by default.
        let http = build_http_client(None)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            tool_timeout,
        })
    }

    /// Timeout applied to CRUD requests.
    const CRUD_TIMEOUT: Duration = Duration::from_secs(30);

    // -----------------------------------------------------------------------
    // Ingestion tools
    // -----------------------------------------------------------------------

    /// Scrape a list of URLs; expects one `{source, text}` per URL.
    #[instrument(skip_all, fields(urls = urls.len()))]
    pub async fn scrape(&self, urls: &[String]) -> Result<Vec<IngestResult>> {
        let url = endpoint(&self.base_url, "tools/scrape");

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&ScrapeRequest {
                urls: urls.to_vec(),
            });
        if let Some(t) = self.tool_timeout {
            request = request.timeout(t);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatdeskError::ingestion(format!("scrape failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatdeskError::ingestion(format!(
                "scrape failed: HTTP {status}"
            )));
        }

        let payload: ToolResults = response
            .json()
            .await
            .map_err(|e| ChatdeskError::ingestion(format!("scrape reply malformed: {e}")))?;

        info!(results = payload.results.len(), "scrape batch returned");
        Ok(payload.results)
    }

    /// Upload a set of documents for text extraction; expects one
    /// `{source, text}` per file.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn upload(&self, files: &[UploadFile]) -> Result<Vec<IngestResult>> {
        let url = endpoint(&self.base_url, "tools/upload");

        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part =
                reqwest::multipart::Part::bytes(file.bytes.clone()).file_name(file.name.clone());
            form = form.part("files", part);
        }

        let mut request = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .multipart(form);
        if let Some(t) = self.tool_timeout {
            request = request.timeout(t);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChatdeskError::ingestion(format!("upload failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatdeskError::ingestion(format!(
                "upload failed: HTTP {status}"
            )));
        }

        let payload: ToolResults = response
            .json()
            .await
            .map_err(|e| ChatdeskError::ingestion(format!("upload reply malformed: {e}")))?;

        info!(results = payload.results.len(), "upload batch returned");
        Ok(payload.results)
    }

    // -----------------------------------------------------------------------
    // Department CRUD
    // -----------------------------------------------------------------------

    /// List all departments for this tenant.
    #[instrument(skip(self))]
    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        let url = endpoint(&self.base_url, "departments");

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Self::CRUD_TIMEOUT)
            .send()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: {e}")))?;

        Self::check_status(&url, response.status())?;

        response
            .json()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: malformed listing: {e}")))
    }

    /// Create a new department record.
    #[instrument(skip_all, fields(name = %department.name))]
    pub async fn create_department(&self, department: &Department) -> Result<Department> {
        let url = endpoint(&self.base_url, "departments");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Self::CRUD_TIMEOUT)
            .json(department)
            .send()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: {e}")))?;

        Self::check_status(&url, response.status())?;

        response
            .json()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: malformed record: {e}")))
    }

    /// Update an existing department record (must carry an id).
    #[instrument(skip_all, fields(name = %department.name))]
    pub async fn update_department(&self, department: &Department) -> Result<Department> {
        let id = department.id.ok_or_else(|| {
            ChatdeskError::validation(format!(
                "department '{}' has no id; save it before updating",
                department.name
            ))
        })?;
        let url = endpoint(&self.base_url, &format!("departments/{id}"));

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Self::CRUD_TIMEOUT)
            .json(department)
            .send()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: {e}")))?;

        Self::check_status(&url, response.status())?;

        response
            .json()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: malformed record: {e}")))
    }

    /// Delete a department by id.
    #[instrument(skip(self))]
    pub async fn delete_department(&self, id: i64) -> Result<()> {
        let url = endpoint(&self.base_url, &format!("departments/{id}"));

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.bearer_token)
            .timeout(Self::CRUD_TIMEOUT)
            .send()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("{url}: {e}")))?;

        Self::check_status(&url, response.status())?;
        debug!(id, "department deleted");
        Ok(())
    }

    /// Probe the backend health endpoint at the server root.
    pub async fn health(&self) -> Result<bool> {
        let root = url::Url::parse(&self.base_url)
            .and_then(|u| u.join("/"))
            .map_err(|e| ChatdeskError::config(format!("bad base URL: {e}")))?;

        let response = self
            .http
            .get(root)
            .timeout(Self::CRUD_TIMEOUT)
            .send()
            .await
            .map_err(|e| ChatdeskError::persistence(format!("health check: {e}")))?;

        Ok(response.status().is_success())
    }

    fn check_status(url: &str, status: reqwest::StatusCode) -> Result<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(ChatdeskError::persistence(format!("{url}: HTTP {status}")))
        }
    }
}
