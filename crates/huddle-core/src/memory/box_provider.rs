//! BoxVectorStore -- object-safe dynamic dispatch wrapper for VectorStoreProvider.
//!
//! Same blanket-impl pattern as BoxEmbedder: an object-safe
//! `VectorStoreProviderDyn` with boxed futures, implemented for every
//! `T: VectorStoreProvider`, and a `BoxVectorStore` that delegates to it.
//! Provided trait methods are routed through the box too, so overrides
//! (e.g. on the dual-write provider) survive type erasure.

use std::future::Future;
use std::pin::Pin;

use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, DocumentPage, HealthStatus, MeetingSearchResult, ProviderCapabilities,
    SearchFilter, SearchOptions, SearchResult, VectorDocument, VectorMetadata,
};

use super::box_embedder::BoxEmbedder;
use super::provider::VectorStoreProvider;
use super::transcript::TranscriptInput;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`VectorStoreProvider`] with boxed futures.
pub trait VectorStoreProviderDyn: Send + Sync {
    fn name_dyn(&self) -> &str;

    fn capabilities_dyn(&self) -> &ProviderCapabilities;

    fn embedder_dyn(&self) -> &BoxEmbedder;

    fn store_boxed<'a>(&'a self, document: &'a VectorDocument) -> BoxFuture<'a, Result<(), MemoryError>>;

    fn store_batch_boxed<'a>(&'a self, documents: &'a [VectorDocument]) -> BoxFuture<'a, BatchResult>;

    fn delete_boxed<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), MemoryError>>;

    fn delete_batch_boxed<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, BatchResult>;

    fn delete_by_meeting_id_boxed<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, BatchResult>;

    fn update_metadata_boxed<'a>(
        &'a self,
        id: &'a str,
        metadata: &'a VectorMetadata,
    ) -> BoxFuture<'a, Result<(), MemoryError>>;

    fn search_boxed<'a>(
        &'a self,
        query_vector: &'a [f32],
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, MemoryError>>;

    fn health_check_boxed(&self) -> BoxFuture<'_, HealthStatus>;

    fn get_vector_count_boxed(&self) -> BoxFuture<'_, Result<u64, MemoryError>>;

    fn fetch_boxed<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<VectorDocument>, MemoryError>>;

    fn list_documents_boxed<'a>(
        &'a self,
        filter: Option<&'a SearchFilter>,
        page_token: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, Result<DocumentPage, MemoryError>>;

    fn shutdown_boxed(&self) -> BoxFuture<'_, ()>;

    fn search_by_text_boxed<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, MemoryError>>;

    fn search_by_meeting_boxed<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<MeetingSearchResult>, MemoryError>>;

    fn process_transcript_boxed<'a>(
        &'a self,
        input: &'a TranscriptInput<'a>,
    ) -> BoxFuture<'a, Result<BatchResult, MemoryError>>;
}

impl<T: VectorStoreProvider> VectorStoreProviderDyn for T {
    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn capabilities_dyn(&self) -> &ProviderCapabilities {
        self.capabilities()
    }

    fn embedder_dyn(&self) -> &BoxEmbedder {
        self.embedder()
    }

    fn store_boxed<'a>(&'a self, document: &'a VectorDocument) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(self.store(document))
    }

    fn store_batch_boxed<'a>(&'a self, documents: &'a [VectorDocument]) -> BoxFuture<'a, BatchResult> {
        Box::pin(self.store_batch(documents))
    }

    fn delete_boxed<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(self.delete(id))
    }

    fn delete_batch_boxed<'a>(&'a self, ids: &'a [String]) -> BoxFuture<'a, BatchResult> {
        Box::pin(self.delete_batch(ids))
    }

    fn delete_by_meeting_id_boxed<'a>(&'a self, meeting_id: &'a str) -> BoxFuture<'a, BatchResult> {
        Box::pin(self.delete_by_meeting_id(meeting_id))
    }

    fn update_metadata_boxed<'a>(
        &'a self,
        id: &'a str,
        metadata: &'a VectorMetadata,
    ) -> BoxFuture<'a, Result<(), MemoryError>> {
        Box::pin(self.update_metadata(id, metadata))
    }

    fn search_boxed<'a>(
        &'a self,
        query_vector: &'a [f32],
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, MemoryError>> {
        Box::pin(self.search(query_vector, options))
    }

    fn health_check_boxed(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(self.health_check())
    }

    fn get_vector_count_boxed(&self) -> BoxFuture<'_, Result<u64, MemoryError>> {
        Box::pin(self.get_vector_count())
    }

    fn fetch_boxed<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<VectorDocument>, MemoryError>> {
        Box::pin(self.fetch(id))
    }

    fn list_documents_boxed<'a>(
        &'a self,
        filter: Option<&'a SearchFilter>,
        page_token: Option<&'a str>,
        page_size: usize,
    ) -> BoxFuture<'a, Result<DocumentPage, MemoryError>> {
        Box::pin(self.list_documents(filter, page_token, page_size))
    }

    fn shutdown_boxed(&self) -> BoxFuture<'_, ()> {
        Box::pin(self.shutdown())
    }

    fn search_by_text_boxed<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<SearchResult>, MemoryError>> {
        Box::pin(self.search_by_text(query, options))
    }

    fn search_by_meeting_boxed<'a>(
        &'a self,
        query: &'a str,
        options: &'a SearchOptions,
    ) -> BoxFuture<'a, Result<Vec<MeetingSearchResult>, MemoryError>> {
        Box::pin(self.search_by_meeting(query, options))
    }

    fn process_transcript_boxed<'a>(
        &'a self,
        input: &'a TranscriptInput<'a>,
    ) -> BoxFuture<'a, Result<BatchResult, MemoryError>> {
        Box::pin(self.process_transcript(input))
    }
}

/// Type-erased vector store selected at runtime by the factory.
///
/// Since `VectorStoreProvider` uses RPITIT it cannot be a trait object
/// directly; `BoxVectorStore` exposes the same operations as inherent
/// methods that delegate to the inner `VectorStoreProviderDyn`.
pub struct BoxVectorStore {
    inner: Box<dyn VectorStoreProviderDyn + Send + Sync>,
}

impl BoxVectorStore {
    pub fn new<T: VectorStoreProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name_dyn()
    }

    pub fn capabilities(&self) -> &ProviderCapabilities {
        self.inner.capabilities_dyn()
    }

    pub fn embedder(&self) -> &BoxEmbedder {
        self.inner.embedder_dyn()
    }

    pub async fn store(&self, document: &VectorDocument) -> Result<(), MemoryError> {
        self.inner.store_boxed(document).await
    }

    pub async fn store_batch(&self, documents: &[VectorDocument]) -> BatchResult {
        self.inner.store_batch_boxed(documents).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.inner.delete_boxed(id).await
    }

    pub async fn delete_batch(&self, ids: &[String]) -> BatchResult {
        self.inner.delete_batch_boxed(ids).await
    }

    pub async fn delete_by_meeting_id(&self, meeting_id: &str) -> BatchResult {
        self.inner.delete_by_meeting_id_boxed(meeting_id).await
    }

    pub async fn update_metadata(&self, id: &str, metadata: &VectorMetadata) -> Result<(), MemoryError> {
        self.inner.update_metadata_boxed(id, metadata).await
    }

    pub async fn search(
        &self,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        self.inner.search_boxed(query_vector, options).await
    }

    pub async fn health_check(&self) -> HealthStatus {
        self.inner.health_check_boxed().await
    }

    pub async fn get_vector_count(&self) -> Result<u64, MemoryError> {
        self.inner.get_vector_count_boxed().await
    }

    pub async fn fetch(&self, id: &str) -> Result<Option<VectorDocument>, MemoryError> {
        self.inner.fetch_boxed(id).await
    }

    pub async fn list_documents(
        &self,
        filter: Option<&SearchFilter>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<DocumentPage, MemoryError> {
        self.inner.list_documents_boxed(filter, page_token, page_size).await
    }

    pub async fn shutdown(&self) {
        self.inner.shutdown_boxed().await
    }

    pub async fn search_by_text(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, MemoryError> {
        self.inner.search_by_text_boxed(query, options).await
    }

    pub async fn search_by_meeting(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<MeetingSearchResult>, MemoryError> {
        self.inner.search_by_meeting_boxed(query, options).await
    }

    pub async fn process_transcript(&self, input: &TranscriptInput<'_>) -> Result<BatchResult, MemoryError> {
        self.inner.process_transcript_boxed(input).await
    }
}

impl std::fmt::Debug for BoxVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxVectorStore")
            .field("name", &self.name())
            .finish()
    }
}
