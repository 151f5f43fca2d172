//! Thin HTTP client for one RuVector collection.

use reqwest::{StatusCode, Url};

use huddle_types::error::MemoryError;
use huddle_types::memory::{SearchFilter, VectorDocument, VectorMetadata};

use super::types::{
    BatchUpsertRequest, CreateCollectionRequest, DeleteByFilterRequest, DeleteByFilterResponse,
    DeleteIdsRequest, QueryRequest, QueryResponse, StatsResponse, StoredVector,
    UpdateMetadataRequest, WireFilter, WireVector,
};
use crate::http::{build_client, check_status, decode_json, transport_error};

pub(super) const PROVIDER: &str = "ruvector";

#[derive(Debug, Clone)]
pub(super) struct RuvectorClient {
    http: reqwest::Client,
    base: Url,
    collection: String,
}

impl RuvectorClient {
    pub(super) fn new(endpoint: &str, collection: &str) -> Result<Self, MemoryError> {
        let base = Url::parse(endpoint)
            .map_err(|e| MemoryError::Config(format!("invalid RuVector endpoint '{endpoint}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(MemoryError::Config(format!(
                "invalid RuVector endpoint '{endpoint}': not a base URL"
            )));
        }
        Ok(Self {
            http: build_client()?,
            base,
            collection: collection.to_string(),
        })
    }

    pub(super) fn collection(&self) -> &str {
        &self.collection
    }

    /// `{endpoint}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn collection_url(&self, rest: &[&str]) -> Url {
        let mut segments = vec!["collections", self.collection.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    async fn send(&self, url: &Url, request: reqwest::RequestBuilder) -> Result<reqwest::Response, MemoryError> {
        tracing::debug!(url = %url, "RuVector request");
        let response = request.send().await.map_err(|e| transport_error(PROVIDER, e))?;
        check_status(PROVIDER, url.as_str(), response).await
    }

    pub(super) async fn health(&self) -> Result<(), MemoryError> {
        let url = self.url(&["health"]);
        self.send(&url, self.http.get(url.clone())).await?;
        Ok(())
    }

    /// Create the collection when the server does not know it yet.
    ///
    /// Returns `true` when the collection was created.
    pub(super) async fn ensure_collection(&self, dimensions: usize) -> Result<bool, MemoryError> {
        let url = self.collection_url(&[]);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if response.status() != StatusCode::NOT_FOUND {
            check_status(PROVIDER, url.as_str(), response).await?;
            return Ok(false);
        }

        let url = self.url(&["collections"]);
        let body = CreateCollectionRequest {
            name: &self.collection,
            dimensions,
            distance_metric: "cosine",
        };
        let response = self
            .http
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        // Lost a creation race with another client.
        if response.status() == StatusCode::CONFLICT {
            return Ok(false);
        }
        check_status(PROVIDER, url.as_str(), response).await?;
        Ok(true)
    }

    pub(super) async fn upsert(&self, document: &VectorDocument) -> Result<(), MemoryError> {
        let url = self.collection_url(&["vectors"]);
        let body = WireVector::from(document);
        self.send(&url, self.http.post(url.clone()).json(&body)).await?;
        Ok(())
    }

    pub(super) async fn upsert_batch(&self, documents: Vec<&VectorDocument>) -> Result<(), MemoryError> {
        let url = self.collection_url(&["vectors", "batch"]);
        let body = BatchUpsertRequest {
            vectors: documents.into_iter().map(WireVector::from).collect(),
        };
        self.send(&url, self.http.post(url.clone()).json(&body)).await?;
        Ok(())
    }

    pub(super) async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        let url = self.collection_url(&["vectors", id]);
        self.send(&url, self.http.delete(url.clone())).await?;
        Ok(())
    }

    pub(super) async fn delete_many(&self, ids: &[String]) -> Result<(), MemoryError> {
        let url = self.collection_url(&["vectors", "delete"]);
        self.send(&url, self.http.post(url.clone()).json(&DeleteIdsRequest { ids }))
            .await?;
        Ok(())
    }

    /// Server-side delete of everything matching `filter`. Returns the
    /// number of vectors removed.
    pub(super) async fn delete_by_filter(&self, filter: &SearchFilter) -> Result<usize, MemoryError> {
        let filter = WireFilter::from_search_filter(filter)
            .ok_or_else(|| MemoryError::InvalidInput("delete filter has no constraints".to_string()))?;
        let url = self.collection_url(&["vectors", "delete-by-filter"]);
        let response = self
            .send(&url, self.http.post(url.clone()).json(&DeleteByFilterRequest { filter }))
            .await?;
        let parsed: DeleteByFilterResponse = decode_json(PROVIDER, response).await?;
        Ok(parsed.deleted)
    }

    pub(super) async fn update_metadata(&self, id: &str, metadata: &VectorMetadata) -> Result<(), MemoryError> {
        let url = self.collection_url(&["vectors", id]);
        let body = UpdateMetadataRequest {
            metadata: metadata.to_storage_map(),
        };
        self.send(&url, self.http.patch(url.clone()).json(&body)).await?;
        Ok(())
    }

    pub(super) async fn query(&self, request: &QueryRequest<'_>) -> Result<QueryResponse, MemoryError> {
        let url = self.collection_url(&["query"]);
        let response = self.send(&url, self.http.post(url.clone()).json(request)).await?;
        decode_json(PROVIDER, response).await
    }

    pub(super) async fn get(&self, id: &str) -> Result<Option<StoredVector>, MemoryError> {
        let url = self.collection_url(&["vectors", id]);
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(PROVIDER, url.as_str(), response).await?;
        decode_json(PROVIDER, response).await.map(Some)
    }

    pub(super) async fn stats(&self) -> Result<StatsResponse, MemoryError> {
        let url = self.collection_url(&["stats"]);
        let response = self.send(&url, self.http.get(url.clone())).await?;
        decode_json(PROVIDER, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_joined_and_encoded() {
        let client = RuvectorClient::new("http://localhost:8080/", "chunks").unwrap();
        assert_eq!(
            client.collection_url(&["vectors", "m 1_chunk_0000"]).as_str(),
            "http://localhost:8080/collections/chunks/vectors/m%201_chunk_0000"
        );
        assert_eq!(client.url(&["health"]).as_str(), "http://localhost:8080/health");
    }

    #[test]
    fn test_endpoint_path_prefix_is_kept() {
        let client = RuvectorClient::new("http://gateway/ruvector", "chunks").unwrap();
        assert_eq!(
            client.collection_url(&["stats"]).as_str(),
            "http://gateway/ruvector/collections/chunks/stats"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_config_error() {
        let err = RuvectorClient::new("not a url", "chunks").unwrap_err();
        assert!(matches!(err, MemoryError::Config(_)));
    }
}
