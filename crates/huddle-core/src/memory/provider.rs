//! Vector store provider trait.
//!
//! One implementation per backend (managed S3 Vectors, self-hosted RuVector)
//! plus the dual-write composite. Backend adapters live in huddle-infra.

use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, DocumentPage, HealthStatus, MeetingSearchResult, ProviderCapabilities,
    SearchFilter, SearchOptions, SearchResult, VectorDocument, VectorMetadata,
};

use super::aggregate::group_by_meeting;
use super::box_embedder::BoxEmbedder;
use super::transcript::{self, TranscriptInput};

/// Backend-agnostic vector storage and similarity search.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
///
/// Batch operations never fail as a whole: per-item failures are counted
/// in the returned [`BatchResult`]. Single-item operations return `Err`
/// when the backend rejects them or cannot be reached.
pub trait VectorStoreProvider: Send + Sync {
    /// Provider name, e.g. "s3-vectors", "ruvector" or "dual(s3-vectors+ruvector)".
    fn name(&self) -> &str;

    /// Static limits and feature flags of this backend.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// The embedding provider paired with this store.
    fn embedder(&self) -> &BoxEmbedder;

    /// Insert or overwrite a single document.
    fn store(
        &self,
        document: &VectorDocument,
    ) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;

    /// Insert or overwrite many documents, split into sub-batches of at most
    /// `capabilities().max_batch_size`.
    fn store_batch(
        &self,
        documents: &[VectorDocument],
    ) -> impl std::future::Future<Output = BatchResult> + Send;

    /// Delete a single document by id.
    fn delete(&self, id: &str) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;

    /// Delete many documents by id.
    fn delete_batch(&self, ids: &[String]) -> impl std::future::Future<Output = BatchResult> + Send;

    /// Delete every chunk belonging to a meeting.
    ///
    /// When the chunks cannot be resolved at all, the result reports one
    /// failure whose id is the meeting id.
    fn delete_by_meeting_id(
        &self,
        meeting_id: &str,
    ) -> impl std::future::Future<Output = BatchResult> + Send;

    /// Replace the metadata of an existing document.
    fn update_metadata(
        &self,
        id: &str,
        metadata: &VectorMetadata,
    ) -> impl std::future::Future<Output = Result<(), MemoryError>> + Send;

    /// Nearest-neighbour search by query vector.
    ///
    /// Results are sorted by descending score, hold at most `options.top_k`
    /// entries and never include scores below `options.min_score`.
    fn search(
        &self,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, MemoryError>> + Send;

    /// Probe backend availability. Never fails; failures are reported in
    /// the returned status.
    fn health_check(&self) -> impl std::future::Future<Output = HealthStatus> + Send;

    /// Total number of stored vectors.
    fn get_vector_count(&self) -> impl std::future::Future<Output = Result<u64, MemoryError>> + Send;

    /// Fetch a single document with its vector. `Ok(None)` when absent.
    fn fetch(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<Option<VectorDocument>, MemoryError>> + Send {
        let _ = id;
        std::future::ready(Err(MemoryError::unsupported(self.name(), "fetch")))
    }

    /// Page through stored documents (vectors and metadata).
    fn list_documents(
        &self,
        filter: Option<&SearchFilter>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> impl std::future::Future<Output = Result<DocumentPage, MemoryError>> + Send {
        let _ = (filter, page_token, page_size);
        std::future::ready(Err(MemoryError::unsupported(self.name(), "list_documents")))
    }

    /// Wait for any background work to finish. No-op for plain backends.
    fn shutdown(&self) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }

    /// Embed `query` with this provider's embedder, then [`search`](Self::search).
    fn search_by_text(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Result<Vec<SearchResult>, MemoryError>> + Send {
        async move {
            let query_vector = self.embedder().generate_embedding(query).await?;
            self.search(&query_vector, options).await
        }
    }

    /// Text search aggregated per meeting, best meeting first.
    fn search_by_meeting(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> impl std::future::Future<Output = Result<Vec<MeetingSearchResult>, MemoryError>> + Send {
        async move {
            let results = self.search_by_text(query, options).await?;
            Ok(group_by_meeting(results))
        }
    }

    /// Chunk, embed and store a meeting transcript.
    fn process_transcript(
        &self,
        input: &TranscriptInput<'_>,
    ) -> impl std::future::Future<Output = Result<BatchResult, MemoryError>> + Send {
        async move { transcript::ingest(self, input).await }
    }
}
