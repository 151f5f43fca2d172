//! RuvectorEmbeddingProvider -- embeddings from the self-hosted RuVector
//! model server (`/embed`, `/embed/batch`).

use serde::{Deserialize, Serialize};

use huddle_core::memory::embedder::{EmbeddingProvider, check_dimensions};
use huddle_types::error::MemoryError;

use crate::http::{BATCH_EMBED_TIMEOUT, build_client, check_status, decode_json, transport_error};

const PROVIDER: &str = "ruvector";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    text: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct EmbedBatchRequest<'a> {
    texts: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedBatchResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug)]
pub struct RuvectorEmbeddingProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    dimensions: usize,
}

impl RuvectorEmbeddingProvider {
    pub fn new(endpoint: &str, model: String, dimensions: usize) -> Result<Self, MemoryError> {
        Ok(Self {
            client: build_client()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            dimensions,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        let url = format!("{}/embed/batch", self.endpoint);
        tracing::debug!(url = %url, count = texts.len(), "RuVector batch embedding request");

        let response = self
            .client
            .post(&url)
            .timeout(BATCH_EMBED_TIMEOUT)
            .json(&EmbedBatchRequest {
                texts,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, &url, response).await?;
        let parsed: EmbedBatchResponse = decode_json(PROVIDER, response).await?;

        if parsed.embeddings.len() != texts.len() {
            return Err(MemoryError::Embedding(format!(
                "batch returned {} embeddings for {} texts",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        for embedding in &parsed.embeddings {
            check_dimensions(embedding, self.dimensions)?;
        }
        Ok(parsed.embeddings)
    }
}

impl EmbeddingProvider for RuvectorEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let url = format!("{}/embed", self.endpoint);
        tracing::debug!(url = %url, model = %self.model, "RuVector embedding request");

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, &url, response).await?;
        let parsed: EmbedResponse = decode_json(PROVIDER, response).await?;

        check_dimensions(&parsed.embedding, self.dimensions)?;
        Ok(parsed.embedding)
    }

    /// Use the batch endpoint, falling back to one request per text when
    /// the batch call fails.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match self.embed_batch(texts).await {
            Ok(embeddings) => Ok(embeddings),
            Err(e) => {
                tracing::warn!(error = %e, count = texts.len(), "Batch embedding failed, embedding sequentially");
                let mut embeddings = Vec::with_capacity(texts.len());
                for text in texts {
                    embeddings.push(self.generate_embedding(text).await?);
                }
                Ok(embeddings)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn texts(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_single_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .and(body_partial_json(serde_json::json!({"text": "hello", "model": "all-MiniLM-L6-v2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [0.1, 0.2, 0.3]})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = RuvectorEmbeddingProvider::new(&server.uri(), "all-MiniLM-L6-v2".to_string(), 3).unwrap();
        assert_eq!(provider.generate_embedding("hello").await.unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_batch_endpoint_used() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/batch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "embeddings": [[1.0, 0.0], [0.0, 1.0]]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = RuvectorEmbeddingProvider::new(&server.uri(), "m".to_string(), 2).unwrap();
        let vectors = provider.generate_embeddings(&texts(&["a", "b"])).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_batch_failure_falls_back_to_sequential() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed/batch"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"embedding": [1.0, 1.0]})))
            .expect(3)
            .mount(&server)
            .await;

        let provider = RuvectorEmbeddingProvider::new(&server.uri(), "m".to_string(), 2).unwrap();
        let vectors = provider.generate_embeddings(&texts(&["a", "b", "c"])).await.unwrap();
        assert_eq!(vectors.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let provider = RuvectorEmbeddingProvider::new(&server.uri(), "m".to_string(), 2).unwrap();
        assert!(provider.generate_embeddings(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let provider = RuvectorEmbeddingProvider::new("http://127.0.0.1:9", "m".to_string(), 2).unwrap();
        let err = provider.generate_embedding("hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::Transport(_)));
    }
}
