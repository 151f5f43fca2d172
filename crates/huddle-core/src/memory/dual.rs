//! Dual-write provider for zero-downtime backend migration.
//!
//! Reads and searches go to the primary only. Every successful primary
//! write is replayed against the secondary in the background on a small
//! worker pool, so the secondary can never slow down or fail a caller.
//! Secondary failures are logged and counted, never surfaced.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, DocumentPage, HealthStatus, ProviderCapabilities, SearchFilter, SearchOptions,
    SearchResult, VectorDocument, VectorMetadata,
};

use super::box_embedder::BoxEmbedder;
use super::box_provider::BoxVectorStore;
use super::provider::VectorStoreProvider;

/// Number of secondary writes allowed in flight at once.
pub const SECONDARY_WORKERS: usize = 2;

/// Counters for background secondary writes.
#[derive(Debug, Default)]
pub struct DualWriteStats {
    dispatched: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`DualWriteStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DualWriteSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl DualWriteSnapshot {
    /// Writes dispatched but not yet finished.
    pub fn pending(&self) -> u64 {
        self.dispatched.saturating_sub(self.succeeded + self.failed)
    }
}

impl DualWriteStats {
    pub fn snapshot(&self) -> DualWriteSnapshot {
        DualWriteSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// An owned copy of a write, replayed against the secondary.
enum SecondaryWrite {
    Store(VectorDocument),
    StoreBatch(Vec<VectorDocument>),
    Delete(String),
    DeleteBatch(Vec<String>),
    DeleteByMeeting(String),
    UpdateMetadata { id: String, metadata: VectorMetadata },
}

impl SecondaryWrite {
    fn operation(&self) -> &'static str {
        match self {
            SecondaryWrite::Store(_) => "store",
            SecondaryWrite::StoreBatch(_) => "store_batch",
            SecondaryWrite::Delete(_) => "delete",
            SecondaryWrite::DeleteBatch(_) => "delete_batch",
            SecondaryWrite::DeleteByMeeting(_) => "delete_by_meeting_id",
            SecondaryWrite::UpdateMetadata { .. } => "update_metadata",
        }
    }

    async fn apply(self, store: &BoxVectorStore) -> Result<(), String> {
        match self {
            SecondaryWrite::Store(document) => store.store(&document).await.map_err(|e| e.to_string()),
            SecondaryWrite::StoreBatch(documents) => batch_outcome(store.store_batch(&documents).await),
            SecondaryWrite::Delete(id) => store.delete(&id).await.map_err(|e| e.to_string()),
            SecondaryWrite::DeleteBatch(ids) => batch_outcome(store.delete_batch(&ids).await),
            SecondaryWrite::DeleteByMeeting(meeting_id) => {
                batch_outcome(store.delete_by_meeting_id(&meeting_id).await)
            }
            SecondaryWrite::UpdateMetadata { id, metadata } => store
                .update_metadata(&id, &metadata)
                .await
                .map_err(|e| e.to_string()),
        }
    }
}

fn batch_outcome(result: BatchResult) -> Result<(), String> {
    if result.failed == 0 {
        return Ok(());
    }
    let first = result
        .errors
        .first()
        .map(|e| format!("{}: {}", e.id, e.error))
        .unwrap_or_default();
    Err(format!(
        "{} of {} items failed (first: {first})",
        result.failed,
        result.total()
    ))
}

/// Writes to a primary store synchronously and mirrors every write to a
/// secondary store in the background.
pub struct DualWriteProvider {
    primary: Arc<BoxVectorStore>,
    secondary: Arc<BoxVectorStore>,
    name: String,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    stats: Arc<DualWriteStats>,
}

impl DualWriteProvider {
    pub fn new(primary: Arc<BoxVectorStore>, secondary: Arc<BoxVectorStore>) -> Self {
        let name = format!("dual({}+{})", primary.name(), secondary.name());
        tracing::info!(
            primary = %primary.name(),
            secondary = %secondary.name(),
            "Dual-write provider initialized"
        );
        Self {
            primary,
            secondary,
            name,
            workers: Arc::new(Semaphore::new(SECONDARY_WORKERS)),
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            stats: Arc::new(DualWriteStats::default()),
        }
    }

    pub fn stats(&self) -> DualWriteSnapshot {
        self.stats.snapshot()
    }

    /// Drop secondary writes that have not started yet and wait for the
    /// ones already running.
    pub async fn cancel_pending(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn dispatch(&self, write: SecondaryWrite) {
        let operation = write.operation();
        if self.tracker.is_closed() {
            self.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                secondary = %self.secondary.name(),
                operation,
                "Dual-write provider is shut down, secondary write skipped"
            );
            return;
        }
        self.stats.dispatched.fetch_add(1, Ordering::Relaxed);

        let secondary = Arc::clone(&self.secondary);
        let workers = Arc::clone(&self.workers);
        let cancel = self.cancel.clone();
        let stats = Arc::clone(&self.stats);

        self.tracker.spawn(async move {
            let _permit = tokio::select! {
                permit = workers.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
                _ = cancel.cancelled() => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(operation, "Secondary write cancelled before it started");
                    return;
                }
            };

            match write.apply(&secondary).await {
                Ok(()) => {
                    stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(secondary = %secondary.name(), operation, "Secondary write completed");
                }
                Err(error) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        secondary = %secondary.name(),
                        operation,
                        error = %error,
                        "Secondary write failed"
                    );
                }
            }
        });
    }
}

impl VectorStoreProvider for DualWriteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        self.primary.capabilities()
    }

    fn embedder(&self) -> &BoxEmbedder {
        self.primary.embedder()
    }

    async fn store(&self, document: &VectorDocument) -> Result<(), MemoryError> {
        self.primary.store(document).await?;
        self.dispatch(SecondaryWrite::Store(document.clone()));
        Ok(())
    }

    async fn store_batch(&self, documents: &[VectorDocument]) -> BatchResult {
        let result = self.primary.store_batch(documents).await;
        self.dispatch(SecondaryWrite::StoreBatch(documents.to_vec()));
        result
    }

    async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.primary.delete(id).await?;
        self.dispatch(SecondaryWrite::Delete(id.to_string()));
        Ok(())
    }

    async fn delete_batch(&self, ids: &[String]) -> BatchResult {
        let result = self.primary.delete_batch(ids).await;
        self.dispatch(SecondaryWrite::DeleteBatch(ids.to_vec()));
        result
    }

    async fn delete_by_meeting_id(&self, meeting_id: &str) -> BatchResult {
        let result = self.primary.delete_by_meeting_id(meeting_id).await;
        self.dispatch(SecondaryWrite::DeleteByMeeting(meeting_id.to_string()));
        result
    }

    async fn update_metadata(&self, id: &str, metadata: &VectorMetadata) -> Result<(), MemoryError> {
        self.primary.update_metadata(id, metadata).await?;
        self.dispatch(SecondaryWrite::UpdateMetadata {
            id: id.to_string(),
            metadata: metadata.clone(),
        });
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>, MemoryError> {
        self.primary.search(query_vector, options).await
    }

    async fn health_check(&self) -> HealthStatus {
        let (primary, secondary) = tokio::join!(self.primary.health_check(), self.secondary.health_check());

        let errors: Vec<String> = [("primary", &primary), ("secondary", &secondary)]
            .into_iter()
            .filter_map(|(role, status)| status.error.as_ref().map(|e| format!("{role}: {e}")))
            .collect();

        HealthStatus {
            healthy: primary.healthy && secondary.healthy,
            provider: self.name.clone(),
            latency_ms: primary.latency_ms.max(secondary.latency_ms),
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        }
    }

    async fn get_vector_count(&self) -> Result<u64, MemoryError> {
        self.primary.get_vector_count().await
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorDocument>, MemoryError> {
        self.primary.fetch(id).await
    }

    async fn list_documents(
        &self,
        filter: Option<&SearchFilter>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<DocumentPage, MemoryError> {
        self.primary.list_documents(filter, page_token, page_size).await
    }

    /// Wait for every dispatched secondary write to finish.
    async fn shutdown(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        let stats = self.stats.snapshot();
        tracing::info!(
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Dual-write provider drained"
        );
    }
}
