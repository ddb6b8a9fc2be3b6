//! The staging buffer: pending, unpersisted ingestion results.

use tokio::sync::Mutex;

use chatdesk_shared::{ChatdeskError, IngestResult, Result, StagedItem, StagedKind};

/// Buffer-and-loading-flag pair behind one mutex.
///
/// Append is order-preserving within a batch and agnostic to interleaving
/// across batches; overlapping submissions are serialized only by the lock.
#[derive(Debug, Default)]
struct StagingState {
    items: Vec<StagedItem>,
    loading: bool,
}

/// Holds scrape/upload results pending administrator review.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    state: Mutex<StagingState>,
}

impl StagingBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a producer batch is currently in flight.
    ///
    /// A hung request with no configured timeout leaves this set until the
    /// process exits; there is no cancellation protocol to clear it.
    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.loading
    }

    /// Set or clear the shared loading flag.
    pub(crate) async fn set_loading(&self, loading: bool) {
        self.state.lock().await.loading = loading;
    }

    /// Append a producer batch in returned order and clear the loading flag.
    ///
    /// Results with empty text are dropped — a failed extraction must never
    /// become a staged item. Returns the number of items appended.
    pub(crate) async fn append_results(
        &self,
        kind: StagedKind,
        results: Vec<IngestResult>,
    ) -> usize {
        let mut state = self.state.lock().await;
        let before = state.items.len();
        state.items.extend(
            results
                .into_iter()
                .filter(|r| !r.text.is_empty())
                .map(|r| StagedItem {
                    kind,
                    source: r.source,
                    text: r.text,
                }),
        );
        state.loading = false;
        state.items.len() - before
    }

    /// Remove one item by index, returning it.
    pub async fn remove(&self, index: usize) -> Result<StagedItem> {
        let mut state = self.state.lock().await;
        if index >= state.items.len() {
            return Err(ChatdeskError::validation(format!(
                "staged index {index} out of range ({} items)",
                state.items.len()
            )));
        }
        Ok(state.items.remove(index))
    }

    /// Current items, in staging order.
    pub async fn snapshot(&self) -> Vec<StagedItem> {
        self.state.lock().await.items.clone()
    }

    /// Number of staged items.
    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Whether the buffer holds no items.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    /// Drop all staged items (side effect of a successful commit).
    pub(crate) async fn clear(&self) {
        self.state.lock().await.items.clear();
    }
}
