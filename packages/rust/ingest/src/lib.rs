//! Ingestion staging: scrape/upload producers feeding one review buffer.
//!
//! Two producers fill the buffer — a URL scrape and a document upload — both
//! under a shared loading flag. Results append in returned order; a failed
//! batch adds nothing and leaves the buffer exactly as before. Staged items
//! are ephemeral: the administrator reviews and removes them by index, and
//! the buffer is fully cleared only as a side effect of a successful commit
//! into a department's knowledge text.

mod buffer;

use tracing::{info, instrument, warn};

use chatdesk_client::{AdminClient, UploadFile};
use chatdesk_shared::{Result, StagedItem, StagedKind};

pub use buffer::StagingBuffer;

/// Orchestrates the two ingestion producers over one staging buffer.
pub struct Ingestor {
    client: AdminClient,
    buffer: StagingBuffer,
}

impl Ingestor {
    /// Create an ingestor backed by the given admin client.
    pub fn new(client: AdminClient) -> Self {
        Self {
            client,
            buffer: StagingBuffer::new(),
        }
    }

    /// The underlying staging buffer.
    pub fn buffer(&self) -> &StagingBuffer {
        &self.buffer
    }

    /// Scrape a raw newline/comma-delimited URL list into the buffer.
    ///
    /// One external call for the whole batch. On success every non-empty
    /// result appends as a `Web` item in returned order; on failure the
    /// buffer is untouched and the error surfaces to the caller. Returns the
    /// number of items staged.
    #[instrument(skip_all)]
    pub async fn scrape_urls(&self, raw: &str) -> Result<usize> {
        let urls = parse_url_list(raw);
        if urls.is_empty() {
            return Ok(0);
        }

        self.buffer.set_loading(true).await;
        let outcome = self.client.scrape(&urls).await;
        match outcome {
            Ok(results) => {
                let staged = self
                    .buffer
                    .append_results(StagedKind::Web, results)
                    .await;
                info!(urls = urls.len(), staged, "scrape batch staged");
                Ok(staged)
            }
            Err(e) => {
                self.buffer.set_loading(false).await;
                warn!(error = %e, "scrape batch failed, buffer unchanged");
                Err(e)
            }
        }
    }

    /// Upload a set of documents into the buffer.
    ///
    /// Same batch contract as [`scrape_urls`](Self::scrape_urls), with `File`
    /// items.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn upload_files(&self, files: &[UploadFile]) -> Result<usize> {
        if files.is_empty() {
            return Ok(0);
        }

        self.buffer.set_loading(true).await;
        let outcome = self.client.upload(files).await;
        match outcome {
            Ok(results) => {
                let staged = self
                    .buffer
                    .append_results(StagedKind::File, results)
                    .await;
                info!(files = files.len(), staged, "upload batch staged");
                Ok(staged)
            }
            Err(e) => {
                self.buffer.set_loading(false).await;
                warn!(error = %e, "upload batch failed, buffer unchanged");
                Err(e)
            }
        }
    }

    /// Remove one staged item by index before commit.
    pub async fn remove(&self, index: usize) -> Result<StagedItem> {
        self.buffer.remove(index).await
    }

    /// Compose all staged items onto `existing` knowledge text.
    ///
    /// The buffer is cleared only when composition succeeds; committing an
    /// empty buffer returns `existing` unchanged.
    #[instrument(skip_all)]
    pub async fn commit(&self, existing: &str) -> Result<String> {
        let items = self.buffer.snapshot().await;
        let composed = chatdesk_compose::append_staged(existing, &items)?;
        self.buffer.clear().await;
        info!(items = items.len(), "staged items committed to knowledge text");
        Ok(composed)
    }
}

/// Split a raw newline/comma-delimited URL list, trimming and dropping
/// empties.
pub fn parse_url_list(raw: &str) -> Vec<String> {
    raw.split(['\n', ','])
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(String::from)
        .collect()
}
