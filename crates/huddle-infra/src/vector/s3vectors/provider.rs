use std::sync::Arc;
use std::time::Instant;

use huddle_core::memory::batch::{delete_in_sub_batches, finalize_results, validate_vector, write_in_sub_batches};
use huddle_core::memory::box_embedder::BoxEmbedder;
use huddle_core::memory::provider::VectorStoreProvider;
use huddle_types::config::ProviderConfig;
use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, DocumentPage, HealthStatus, ProviderCapabilities, SearchFilter, SearchOptions, SearchResult,
    VectorDocument, VectorMetadata,
};

use super::api::{
    DeleteVectorsRequest, GetVectorsRequest, ListVectorsRequest, OutputVector, PutInputVector, PutVectorsRequest,
    QueryOutputVector, QueryVectorsRequest, S3VectorsApi, VectorData, metadata_filter,
};
use super::client::HttpS3VectorsClient;
use crate::aws::AwsCredentials;

const PROVIDER: &str = "s3-vectors";

/// Largest vector an S3 Vectors index accepts.
pub const MAX_DIMENSIONS: usize = 2048;

/// Page size cap for `ListVectors`.
const MAX_LIST_PAGE: usize = 1000;

/// Score step for query hits that carry neither a score nor a distance.
const POSITION_SCORE_STEP: f32 = 0.05;

pub struct S3VectorsProvider<C: S3VectorsApi = HttpS3VectorsClient> {
    api: C,
    bucket: String,
    index_name: String,
    embedder: Arc<BoxEmbedder>,
    capabilities: ProviderCapabilities,
}

impl S3VectorsProvider<HttpS3VectorsClient> {
    pub fn new(
        config: &ProviderConfig,
        credentials: AwsCredentials,
        embedder: Arc<BoxEmbedder>,
    ) -> Result<Self, MemoryError> {
        let api = HttpS3VectorsClient::new(credentials, config.region.clone())?;
        Ok(Self::with_api(api, config, embedder))
    }
}

impl<C: S3VectorsApi> S3VectorsProvider<C> {
    pub fn with_api(api: C, config: &ProviderConfig, embedder: Arc<BoxEmbedder>) -> Self {
        tracing::info!(
            bucket = %config.bucket,
            index = %config.index_name,
            region = %config.region,
            embedder = %embedder.name(),
            "S3 Vectors provider initialized"
        );
        Self {
            api,
            bucket: config.bucket.clone(),
            index_name: config.index_name.clone(),
            embedder,
            capabilities: ProviderCapabilities {
                max_vector_dimensions: MAX_DIMENSIONS,
                max_batch_size: config.max_batch_size,
                supports_filtering: true,
                supports_metadata: true,
                supports_deletion: true,
                supports_update: false,
                supports_count: false,
                supports_listing: true,
            },
        }
    }

    pub fn api(&self) -> &C {
        &self.api
    }

    fn put_request(&self, documents: &[&VectorDocument]) -> PutVectorsRequest {
        PutVectorsRequest {
            vector_bucket_name: self.bucket.clone(),
            index_name: self.index_name.clone(),
            vectors: documents
                .iter()
                .map(|doc| PutInputVector {
                    key: doc.id.clone(),
                    data: VectorData {
                        float32: doc.vector.clone(),
                    },
                    metadata: doc.metadata.to_storage_map(),
                })
                .collect(),
        }
    }

    fn delete_request(&self, keys: Vec<String>) -> DeleteVectorsRequest {
        DeleteVectorsRequest {
            vector_bucket_name: self.bucket.clone(),
            index_name: self.index_name.clone(),
            keys,
        }
    }

    /// Every key whose metadata matches `filter`, following `nextToken`.
    async fn list_keys(&self, filter: &SearchFilter) -> Result<Vec<String>, MemoryError> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_documents(Some(filter), token.as_deref(), MAX_LIST_PAGE).await?;
            keys.extend(page.documents.into_iter().map(|doc| doc.id));
            match page.next_token {
                Some(next) => token = Some(next),
                None => return Ok(keys),
            }
        }
    }
}

fn output_to_document(output: OutputVector) -> VectorDocument {
    VectorDocument {
        metadata: output
            .metadata
            .as_ref()
            .map(VectorMetadata::from_storage_value)
            .unwrap_or_else(|| VectorMetadata::new("", "", 0)),
        vector: output.data.map(|d| d.float32).unwrap_or_default(),
        id: output.key,
    }
}

/// Prefer an explicit score, then cosine distance, then rank position.
fn hit_score(hit: &QueryOutputVector, position: usize) -> f32 {
    hit.score
        .or(hit.distance.map(|d| 1.0 - d))
        .unwrap_or(1.0 - position as f32 * POSITION_SCORE_STEP)
}

impl<C: S3VectorsApi> VectorStoreProvider for S3VectorsProvider<C> {
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
        self.api.put_vectors(self.put_request(&[document])).await
    }

    async fn store_batch(&self, documents: &[VectorDocument]) -> BatchResult {
        write_in_sub_batches(
            PROVIDER,
            documents,
            self.capabilities.max_batch_size,
            MAX_DIMENSIONS,
            move |chunk| self.api.put_vectors(self.put_request(&chunk)),
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.api.delete_vectors(self.delete_request(vec![id.to_string()])).await
    }

    async fn delete_batch(&self, ids: &[String]) -> BatchResult {
        delete_in_sub_batches(PROVIDER, ids, self.capabilities.max_batch_size, move |chunk| {
            self.api.delete_vectors(self.delete_request(chunk.to_vec()))
        })
        .await
    }

    async fn delete_by_meeting_id(&self, meeting_id: &str) -> BatchResult {
        let keys = match self.list_keys(&SearchFilter::meeting(meeting_id)).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(meeting_id = %meeting_id, error = %e, "Listing meeting vectors failed");
                return BatchResult::all_failed([meeting_id], &e.to_string());
            }
        };
        if keys.is_empty() {
            tracing::debug!(meeting_id = %meeting_id, "No vectors to delete for meeting");
            return BatchResult::default();
        }
        let result = self.delete_batch(&keys).await;
        tracing::info!(
            meeting_id = %meeting_id,
            deleted = result.successful,
            failed = result.failed,
            "Deleted meeting vectors"
        );
        result
    }

    async fn update_metadata(&self, _id: &str, _metadata: &VectorMetadata) -> Result<(), MemoryError> {
        Err(MemoryError::unsupported(PROVIDER, "update_metadata"))
    }

    async fn search(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>, MemoryError> {
        let request = QueryVectorsRequest {
            vector_bucket_name: self.bucket.clone(),
            index_name: self.index_name.clone(),
            query_vector: VectorData {
                float32: query_vector.to_vec(),
            },
            top_k: options.top_k,
            filter: options.filter.as_ref().and_then(metadata_filter),
            return_metadata: options.include_metadata,
            return_distance: true,
        };
        let response = self.api.query_vectors(request).await?;

        let results = response
            .vectors
            .into_iter()
            .enumerate()
            .map(|(position, hit)| SearchResult {
                score: hit_score(&hit, position),
                metadata: hit
                    .metadata
                    .as_ref()
                    .map(VectorMetadata::from_storage_value)
                    .unwrap_or_else(|| VectorMetadata::new("", "", 0)),
                id: hit.key,
                vector: None,
            })
            .collect();
        Ok(finalize_results(results, options))
    }

    /// Runs a top-1 query with a unit vector sized for the embedder.
    async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        let mut probe = vec![0.0f32; self.embedder.dimensions().max(1)];
        probe[0] = 1.0;
        let outcome = self.search(&probe, &SearchOptions::top_k(1)).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        HealthStatus {
            healthy: outcome.is_ok(),
            provider: PROVIDER.to_string(),
            latency_ms,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    async fn get_vector_count(&self) -> Result<u64, MemoryError> {
        Err(MemoryError::unsupported(PROVIDER, "get_vector_count"))
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorDocument>, MemoryError> {
        let response = self
            .api
            .get_vectors(GetVectorsRequest {
                vector_bucket_name: self.bucket.clone(),
                index_name: self.index_name.clone(),
                keys: vec![id.to_string()],
                return_data: true,
                return_metadata: true,
            })
            .await?;
        Ok(response
            .vectors
            .into_iter()
            .find(|v| v.key == id)
            .map(output_to_document))
    }

    /// The filter is sent to the service and re-applied locally, so pages
    /// may hold fewer than `page_size` documents.
    async fn list_documents(
        &self,
        filter: Option<&SearchFilter>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<DocumentPage, MemoryError> {
        let request = ListVectorsRequest {
            vector_bucket_name: self.bucket.clone(),
            index_name: self.index_name.clone(),
            max_results: Some(page_size.clamp(1, MAX_LIST_PAGE) as u32),
            next_token: page_token.map(str::to_string),
            return_data: true,
            return_metadata: true,
            filter: filter.and_then(metadata_filter),
        };
        let response = self.api.list_vectors(request).await?;

        let documents = response
            .vectors
            .into_iter()
            .map(output_to_document)
            .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .collect();
        Ok(DocumentPage {
            documents,
            next_token: response.next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::memory::embedder::EmbeddingProvider;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use crate::vector::s3vectors::api::{GetVectorsResponse, ListVectorsResponse, QueryVectorsResponse};

    struct UnitEmbedder;

    impl EmbeddingProvider for UnitEmbedder {
        fn name(&self) -> &str {
            "unit"
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn generate_embedding(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
            Ok(vec![1.0, 0.0, 0.0])
        }
    }

    /// In-memory S3 Vectors index that pages `ListVectors` two keys at a time.
    #[derive(Default)]
    struct FakeS3Vectors {
        vectors: Mutex<BTreeMap<String, (Vec<f32>, Value)>>,
        put_calls: Mutex<Vec<usize>>,
        queries: Mutex<Vec<QueryVectorsRequest>>,
        query_hits: Mutex<Vec<QueryOutputVector>>,
        fail_puts: AtomicBool,
        fail_lists: AtomicBool,
    }

    impl FakeS3Vectors {
        const PAGE: usize = 2;

        fn keys(&self) -> Vec<String> {
            self.vectors.lock().unwrap().keys().cloned().collect()
        }
    }

    fn unavailable() -> MemoryError {
        MemoryError::Http {
            provider: PROVIDER.to_string(),
            status: 503,
            body: "SlowDown".to_string(),
        }
    }

    impl S3VectorsApi for FakeS3Vectors {
        async fn put_vectors(&self, request: PutVectorsRequest) -> Result<(), MemoryError> {
            self.put_calls.lock().unwrap().push(request.vectors.len());
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            let mut vectors = self.vectors.lock().unwrap();
            for v in request.vectors {
                let metadata = serde_json::to_value(&v.metadata).unwrap();
                vectors.insert(v.key, (v.data.float32, metadata));
            }
            Ok(())
        }

        async fn delete_vectors(&self, request: DeleteVectorsRequest) -> Result<(), MemoryError> {
            let mut vectors = self.vectors.lock().unwrap();
            for key in request.keys {
                vectors.remove(&key);
            }
            Ok(())
        }

        async fn list_vectors(&self, request: ListVectorsRequest) -> Result<ListVectorsResponse, MemoryError> {
            if self.fail_lists.load(Ordering::SeqCst) {
                return Err(unavailable());
            }
            let start: usize = request.next_token.as_deref().map_or(0, |t| t.parse().unwrap());
            let vectors = self.vectors.lock().unwrap();
            let page: Vec<OutputVector> = vectors
                .iter()
                .skip(start)
                .take(Self::PAGE)
                .map(|(key, (data, metadata))| OutputVector {
                    key: key.clone(),
                    data: request.return_data.then(|| VectorData { float32: data.clone() }),
                    metadata: request.return_metadata.then(|| metadata.clone()),
                })
                .collect();
            let next = start + Self::PAGE;
            Ok(ListVectorsResponse {
                vectors: page,
                next_token: (next < vectors.len()).then(|| next.to_string()),
            })
        }

        async fn query_vectors(&self, request: QueryVectorsRequest) -> Result<QueryVectorsResponse, MemoryError> {
            self.queries.lock().unwrap().push(request);
            Ok(QueryVectorsResponse {
                vectors: self.query_hits.lock().unwrap().clone(),
            })
        }

        async fn get_vectors(&self, request: GetVectorsRequest) -> Result<GetVectorsResponse, MemoryError> {
            let vectors = self.vectors.lock().unwrap();
            Ok(GetVectorsResponse {
                vectors: request
                    .keys
                    .iter()
                    .filter_map(|key| {
                        vectors.get(key).map(|(data, metadata)| OutputVector {
                            key: key.clone(),
                            data: Some(VectorData { float32: data.clone() }),
                            metadata: Some(metadata.clone()),
                        })
                    })
                    .collect(),
            })
        }
    }

    fn provider(max_batch_size: usize) -> S3VectorsProvider<FakeS3Vectors> {
        let config = ProviderConfig {
            bucket: "bucket".to_string(),
            index_name: "index".to_string(),
            max_batch_size,
            ..ProviderConfig::default()
        };
        S3VectorsProvider::with_api(FakeS3Vectors::default(), &config, Arc::new(BoxEmbedder::new(UnitEmbedder)))
    }

    fn document(meeting_id: &str, index: u32) -> VectorDocument {
        let mut metadata = VectorMetadata::new(meeting_id, format!("{meeting_id}.txt"), index);
        metadata.text = Some(format!("chunk {index}"));
        VectorDocument {
            id: VectorDocument::chunk_id(meeting_id, index),
            vector: vec![1.0, 0.0, 0.0],
            metadata,
        }
    }

    fn hit(key: &str, score: Option<f32>, distance: Option<f32>) -> QueryOutputVector {
        QueryOutputVector {
            key: key.to_string(),
            score,
            distance,
            metadata: Some(json!({"meeting_id": "m1", "chunk_index": "0"})),
        }
    }

    #[tokio::test]
    async fn test_store_batch_uses_sub_batches() {
        let provider = provider(2);
        let documents: Vec<VectorDocument> = (0..5).map(|i| document("m1", i)).collect();

        let result = provider.store_batch(&documents).await;

        assert_eq!(result.successful, 5);
        assert_eq!(*provider.api().put_calls.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(provider.api().keys().len(), 5);
    }

    #[tokio::test]
    async fn test_failed_puts_are_reported_per_document() {
        let provider = provider(100);
        provider.api().fail_puts.store(true, Ordering::SeqCst);
        let documents: Vec<VectorDocument> = (0..3).map(|i| document("m1", i)).collect();

        let result = provider.store_batch(&documents).await;

        assert_eq!(result.successful, 0);
        assert_eq!(result.failed, 3);
        assert_eq!(result.errors[2].id, "m1_chunk_0002");
    }

    #[tokio::test]
    async fn test_delete_by_meeting_follows_pages() {
        let provider = provider(100);
        let mut documents: Vec<VectorDocument> = (0..5).map(|i| document("m1", i)).collect();
        documents.push(document("m2", 0));
        provider.store_batch(&documents).await;

        let result = provider.delete_by_meeting_id("m1").await;

        assert_eq!(result.successful, 5);
        assert_eq!(result.failed, 0);
        assert_eq!(provider.api().keys(), vec!["m2_chunk_0000".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_by_meeting_without_matches() {
        let provider = provider(100);
        provider.store_batch(&[document("m2", 0)]).await;

        let result = provider.delete_by_meeting_id("m1").await;
        assert_eq!(result.total(), 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_meeting_list_failure() {
        let provider = provider(100);
        provider.api().fail_lists.store(true, Ordering::SeqCst);

        let result = provider.delete_by_meeting_id("m1").await;
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].id, "m1");
    }

    #[tokio::test]
    async fn test_update_and_count_are_unsupported() {
        let provider = provider(100);
        let metadata = VectorMetadata::new("m1", "m1.txt", 0);
        assert!(matches!(
            provider.update_metadata("m1_chunk_0000", &metadata).await,
            Err(MemoryError::Unsupported { .. })
        ));
        assert!(matches!(
            provider.get_vector_count().await,
            Err(MemoryError::Unsupported { .. })
        ));
    }

    #[tokio::test]
    async fn test_search_scores_and_filter() {
        let provider = provider(100);
        *provider.api().query_hits.lock().unwrap() = vec![
            hit("a", Some(0.8), None),
            hit("b", None, Some(0.5)),
            hit("c", None, None),
        ];

        let options = SearchOptions::top_k(5).with_filter(SearchFilter::meeting("m1"));
        let results = provider.search(&[1.0, 0.0, 0.0], &options).await.unwrap();

        let scored: Vec<(&str, f32)> = results.iter().map(|r| (r.id.as_str(), r.score)).collect();
        assert_eq!(scored, vec![("c", 0.9), ("a", 0.8), ("b", 0.5)]);
        assert_eq!(results[0].metadata.meeting_id, "m1");

        let queries = provider.api().queries.lock().unwrap();
        assert_eq!(queries[0].filter, Some(json!({"meeting_id": {"$eq": "m1"}})));
        assert_eq!(queries[0].top_k, 5);
        assert!(queries[0].return_metadata);
    }

    #[tokio::test]
    async fn test_search_without_metadata() {
        let provider = provider(100);
        *provider.api().query_hits.lock().unwrap() = vec![hit("a", Some(0.8), None)];

        let options = SearchOptions {
            include_metadata: false,
            ..SearchOptions::top_k(3)
        };
        let results = provider.search(&[1.0, 0.0, 0.0], &options).await.unwrap();
        assert_eq!(results[0].id, "a");

        let queries = provider.api().queries.lock().unwrap();
        assert!(!queries[0].return_metadata);
        assert!(queries[0].return_distance);
    }

    #[tokio::test]
    async fn test_position_scores_without_distance() {
        let provider = provider(100);
        *provider.api().query_hits.lock().unwrap() = vec![hit("a", None, None), hit("b", None, None)];

        let results = provider
            .search(&[1.0, 0.0, 0.0], &SearchOptions::default().with_min_score(0.96))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_health_check_probes_with_unit_vector() {
        let provider = provider(100);
        let status = provider.health_check().await;
        assert!(status.healthy);
        assert_eq!(status.provider, "s3-vectors");

        let queries = provider.api().queries.lock().unwrap();
        assert_eq!(queries[0].query_vector.float32, vec![1.0, 0.0, 0.0]);
        assert_eq!(queries[0].top_k, 1);
    }

    #[tokio::test]
    async fn test_fetch_and_list_documents() {
        let provider = provider(100);
        let documents: Vec<VectorDocument> = (0..3).map(|i| document("m1", i)).collect();
        provider.store_batch(&documents).await;

        let fetched = provider.fetch("m1_chunk_0001").await.unwrap().unwrap();
        assert_eq!(fetched.metadata.chunk_index, 1);
        assert_eq!(fetched.metadata.text.as_deref(), Some("chunk 1"));
        assert!(provider.fetch("missing").await.unwrap().is_none());

        let first = provider.list_documents(None, None, 10).await.unwrap();
        assert_eq!(first.documents.len(), 2);
        let second = provider
            .list_documents(None, first.next_token.as_deref(), 10)
            .await
            .unwrap();
        assert_eq!(second.documents.len(), 1);
        assert!(second.next_token.is_none());
    }
}
