//! Self-hosted RuVector backend.
//!
//! Talks to a RuVector server over its REST API. One provider instance is
//! bound to a single collection.

mod client;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use huddle_core::memory::batch::{delete_in_sub_batches, finalize_results, validate_vector, write_in_sub_batches};
use huddle_core::memory::box_embedder::BoxEmbedder;
use huddle_core::memory::provider::VectorStoreProvider;
use huddle_types::config::ProviderConfig;
use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, HealthStatus, ProviderCapabilities, SearchFilter, SearchOptions, SearchResult,
    VectorDocument, VectorMetadata,
};

use client::{PROVIDER, RuvectorClient};
use types::{QueryRequest, WireFilter};

/// Largest vector the server accepts.
pub const MAX_DIMENSIONS: usize = 4096;

pub struct RuvectorProvider {
    client: RuvectorClient,
    embedder: Arc<BoxEmbedder>,
    capabilities: ProviderCapabilities,
}

impl RuvectorProvider {
    pub fn new(config: &ProviderConfig, embedder: Arc<BoxEmbedder>) -> Result<Self, MemoryError> {
        let client = RuvectorClient::new(&config.endpoint, &config.collection)?;
        tracing::info!(
            endpoint = %config.endpoint,
            collection = %config.collection,
            embedder = %embedder.name(),
            "RuVector provider initialized"
        );
        Ok(Self {
            client,
            embedder,
            capabilities: ProviderCapabilities {
                max_vector_dimensions: MAX_DIMENSIONS,
                max_batch_size: config.max_batch_size,
                supports_filtering: true,
                supports_metadata: true,
                supports_deletion: true,
                supports_update: true,
                supports_count: true,
                supports_listing: false,
            },
        })
    }

    /// Create the collection, sized for this provider's embedder, if the
    /// server does not have it yet. Returns `true` when it was created.
    pub async fn ensure_collection(&self) -> Result<bool, MemoryError> {
        let created = self.client.ensure_collection(self.embedder.dimensions()).await?;
        if created {
            tracing::info!(
                collection = %self.client.collection(),
                dimensions = self.embedder.dimensions(),
                "Created RuVector collection"
            );
        }
        Ok(created)
    }
}

impl VectorStoreProvider for RuvectorProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn embedder(&self) -> &BoxEmbedder {
        &self.embedder
    }

    async fn store(&self, document: &VectorDocument) -> Result<(), MemoryError> {
        validate_vector(document, MAX_DIMENSIONS)?;
        self.client.upsert(document).await
    }

    async fn store_batch(&self, documents: &[VectorDocument]) -> BatchResult {
        let client = &self.client;
        write_in_sub_batches(
            PROVIDER,
            documents,
            self.capabilities.max_batch_size,
            MAX_DIMENSIONS,
            move |chunk| client.upsert_batch(chunk),
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.client.delete(id).await
    }

    async fn delete_batch(&self, ids: &[String]) -> BatchResult {
        let client = &self.client;
        delete_in_sub_batches(PROVIDER, ids, self.capabilities.max_batch_size, move |chunk| {
            client.delete_many(chunk)
        })
        .await
    }

    async fn delete_by_meeting_id(&self, meeting_id: &str) -> BatchResult {
        match self.client.delete_by_filter(&SearchFilter::meeting(meeting_id)).await {
            Ok(deleted) => {
                tracing::info!(meeting_id = %meeting_id, deleted, "Deleted meeting vectors");
                BatchResult::succeeded(deleted)
            }
            Err(e) => {
                tracing::warn!(meeting_id = %meeting_id, error = %e, "Delete by meeting failed");
                BatchResult::all_failed([meeting_id], &e.to_string())
            }
        }
    }

    async fn update_metadata(&self, id: &str, metadata: &VectorMetadata) -> Result<(), MemoryError> {
        self.client.update_metadata(id, metadata).await
    }

    async fn search(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>, MemoryError> {
        let request = QueryRequest {
            vector: query_vector,
            top_k: options.top_k,
            include_metadata: options.include_metadata,
            filter: options.filter.as_ref().and_then(WireFilter::from_search_filter),
            include_vectors: options.include_vector,
        };
        let response = self.client.query(&request).await?;

        let results = response
            .results
            .into_iter()
            .map(|hit| SearchResult {
                metadata: VectorMetadata::from_storage_value(&hit.metadata),
                id: hit.id,
                score: hit.score,
                vector: hit.vector,
            })
            .collect();
        Ok(finalize_results(results, options))
    }

    async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        let outcome = self.client.health().await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        HealthStatus {
            healthy: outcome.is_ok(),
            provider: PROVIDER.to_string(),
            latency_ms,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    async fn get_vector_count(&self) -> Result<u64, MemoryError> {
        Ok(self.client.stats().await?.vector_count)
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorDocument>, MemoryError> {
        let stored = self.client.get(id).await?;
        Ok(stored.map(|stored| VectorDocument {
            metadata: VectorMetadata::from_storage_value(&stored.metadata),
            id: stored.id,
            vector: stored.vector,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::memory::embedder::EmbeddingProvider;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct ConstantEmbedder;

    impl EmbeddingProvider for ConstantEmbedder {
        fn name(&self) -> &str {
            "constant"
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            Ok(vec![1.0, 0.0])
        }
    }

    fn provider(server: &MockServer, max_batch_size: usize) -> RuvectorProvider {
        let config = ProviderConfig {
            endpoint: server.uri(),
            collection: "chunks".to_string(),
            max_batch_size,
            ..ProviderConfig::default()
        };
        RuvectorProvider::new(&config, Arc::new(BoxEmbedder::new(ConstantEmbedder))).unwrap()
    }

    fn document(meeting_id: &str, index: u32) -> VectorDocument {
        let mut metadata = VectorMetadata::new(meeting_id, format!("transcripts/{meeting_id}.txt"), index);
        metadata.speaker = Some("Alice".to_string());
        metadata.text = Some(format!("chunk {index}"));
        VectorDocument {
            id: VectorDocument::chunk_id(meeting_id, index),
            vector: vec![1.0, 0.0],
            metadata,
        }
    }

    #[tokio::test]
    async fn test_store_posts_flattened_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors"))
            .and(body_json(json!({
                "id": "m1_chunk_0000",
                "vector": [1.0, 0.0],
                "metadata": {
                    "meeting_id": "m1",
                    "s3_key": "transcripts/m1.txt",
                    "chunk_index": "0",
                    "speaker": "Alice",
                    "text": "chunk 0"
                }
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server, 100).store(&document("m1", 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_store_batch_splits_and_counts_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/batch"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/batch"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let documents: Vec<VectorDocument> = (0..5).map(|i| document("m1", i)).collect();
        let result = provider(&server, 3).store_batch(&documents).await;

        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].error.contains("disk full"));
    }

    #[tokio::test]
    async fn test_oversized_vector_rejected_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut doc = document("m1", 0);
        doc.vector = vec![0.1; MAX_DIMENSIONS + 1];
        let err = provider(&server, 100).store(&doc).await.unwrap_err();
        assert!(matches!(err, MemoryError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_by_meeting_reports_server_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete-by-filter"))
            .and(body_json(json!({"filter": {"field": "meeting_id", "value": "m1"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 7})))
            .mount(&server)
            .await;

        let result = provider(&server, 100).delete_by_meeting_id("m1").await;
        assert_eq!(result.successful, 7);
        assert_eq!(result.failed, 0);
    }

    #[tokio::test]
    async fn test_delete_by_meeting_failure_reports_meeting_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete-by-filter"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = provider(&server, 100).delete_by_meeting_id("m1").await;
        assert_eq!(result.successful, 0);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].id, "m1");
    }

    #[tokio::test]
    async fn test_update_metadata_patches_vector() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/collections/chunks/vectors/m1_chunk_0000"))
            .and(body_json(json!({
                "metadata": {
                    "meeting_id": "m1",
                    "s3_key": "transcripts/m1.txt",
                    "chunk_index": "0",
                    "speaker": "Alice",
                    "text": "chunk 0"
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let doc = document("m1", 0);
        provider(&server, 100)
            .update_metadata(&doc.id, &doc.metadata)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_metadata_missing_vector_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/collections/chunks/vectors/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = provider(&server, 100)
            .update_metadata("gone", &VectorMetadata::new("m1", "k", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_delete_single_vector() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/collections/chunks/vectors/m1_chunk_0003"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        provider(&server, 100).delete("m1_chunk_0003").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_batch_splits_ids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete"))
            .and(body_json(json!({"ids": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete"))
            .and(body_json(json!({"ids": ["c"]})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let result = provider(&server, 2).delete_batch(&ids).await;
        assert_eq!(result.successful, 3);
        assert_eq!(result.failed, 0);
    }

    #[tokio::test]
    async fn test_delete_batch_failure_marks_sub_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete"))
            .and(body_json(json!({"ids": ["a", "b"]})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/vectors/delete"))
            .and(body_json(json!({"ids": ["c"]})))
            .respond_with(ResponseTemplate::new(500).set_body_string("locked"))
            .mount(&server)
            .await;

        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let result = provider(&server, 2).delete_batch(&ids).await;
        assert_eq!(result.successful, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].id, "c");
        assert!(result.errors[0].error.contains("locked"));
    }

    #[tokio::test]
    async fn test_search_sends_filter_and_applies_min_score() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/chunks/query"))
            .and(body_json(json!({
                "vector": [1.0, 0.0],
                "top_k": 2,
                "include_metadata": true,
                "filter": {"field": "meeting_id", "value": "m1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "m1_chunk_0001", "score": 0.4, "metadata": {"meeting_id": "m1", "chunk_index": 1}},
                    {"id": "m1_chunk_0000", "score": 0.9, "metadata": {"meeting_id": "m1", "chunk_index": "0", "speaker": "Alice"}}
                ]
            })))
            .mount(&server)
            .await;

        let options = SearchOptions::top_k(2)
            .with_filter(SearchFilter::meeting("m1"))
            .with_min_score(0.5);
        let results = provider(&server, 100).search(&[1.0, 0.0], &options).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "m1_chunk_0000");
        assert_eq!(results[0].metadata.speaker.as_deref(), Some("Alice"));
        assert!(results[0].vector.is_none());
    }

    #[tokio::test]
    async fn test_health_check_reports_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("starting"))
            .mount(&server)
            .await;

        let status = provider(&server, 100).health_check().await;
        assert!(!status.healthy);
        assert_eq!(status.provider, "ruvector");
        assert!(status.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_vector_count_from_stats() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/chunks/stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"vector_count": 42, "dimensions": 2})))
            .mount(&server)
            .await;

        assert_eq!(provider(&server, 100).get_vector_count().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_fetch_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/chunks/vectors/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider(&server, 100).fetch("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/chunks"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/collections"))
            .and(body_json(json!({"name": "chunks", "dimensions": 2, "distance_metric": "cosine"})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        assert!(provider(&server, 100).ensure_collection().await.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_collection_existing_is_noop() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/chunks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "chunks"})))
            .mount(&server)
            .await;

        assert!(!provider(&server, 100).ensure_collection().await.unwrap());
    }
}
