//! In-memory provider and deterministic embedder for unit tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use huddle_types::error::MemoryError;
use huddle_types::memory::{
    BatchResult, DocumentPage, HealthStatus, ProviderCapabilities, SearchFilter, SearchOptions,
    SearchResult, VectorDocument, VectorMetadata,
};

use super::batch::{delete_in_sub_batches, finalize_results, write_in_sub_batches};
use super::box_embedder::BoxEmbedder;
use super::embedder::EmbeddingProvider;
use super::provider::VectorStoreProvider;

/// A chunk document with `text = "chunk {index}"`.
pub(crate) fn doc(meeting_id: &str, index: u32, vector: Vec<f32>) -> VectorDocument {
    let mut metadata = VectorMetadata::new(meeting_id, format!("{meeting_id}.json"), index);
    metadata.text = Some(format!("chunk {index}"));
    VectorDocument {
        id: VectorDocument::chunk_id(meeting_id, index),
        vector,
        metadata,
    }
}

/// Bag-of-words hashing embedder that records every input it sees.
#[derive(Clone)]
pub(crate) struct FakeEmbedder {
    dimensions: usize,
    inputs: Arc<Mutex<Vec<String>>>,
}

impl FakeEmbedder {
    pub(crate) fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            inputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
            vector[(hash % self.dimensions as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[0] = 1.0;
        } else {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.inputs.lock().unwrap().push(text.to_string());
        Ok(self.embed(text))
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// A `VectorStoreProvider` backed by a map, with switchable write failures
/// and an optional delay on every write.
pub(crate) struct InMemoryVectorStore {
    name: String,
    capabilities: ProviderCapabilities,
    embedder: BoxEmbedder,
    fake: FakeEmbedder,
    documents: Mutex<BTreeMap<String, VectorDocument>>,
    fail_writes: AtomicBool,
    write_delay: Option<Duration>,
}

impl InMemoryVectorStore {
    pub(crate) fn new(name: &str, dimensions: usize) -> Self {
        let fake = FakeEmbedder::new(dimensions);
        Self {
            name: name.to_string(),
            capabilities: ProviderCapabilities {
                max_vector_dimensions: 4096,
                max_batch_size: 100,
                supports_filtering: true,
                supports_metadata: true,
                supports_deletion: true,
                supports_update: true,
                supports_count: true,
                supports_listing: true,
            },
            embedder: BoxEmbedder::new(fake.clone()),
            fake,
            documents: Mutex::new(BTreeMap::new()),
            fail_writes: AtomicBool::new(false),
            write_delay: None,
        }
    }

    pub(crate) fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn get(&self, id: &str) -> Option<VectorDocument> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub(crate) fn embedder_inputs(&self) -> Vec<String> {
        self.fake.inputs()
    }

    async fn before_write(&self) -> Result<(), MemoryError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(MemoryError::Transport(format!("{} is unavailable", self.name)));
        }
        Ok(())
    }

    fn insert(&self, documents: &[&VectorDocument]) {
        let mut map = self.documents.lock().unwrap();
        for document in documents {
            map.insert(document.id.clone(), (*document).clone());
        }
    }

    fn remove(&self, ids: &[String]) {
        let mut map = self.documents.lock().unwrap();
        for id in ids {
            map.remove(id);
        }
    }
}

impl VectorStoreProvider for InMemoryVectorStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    fn embedder(&self) -> &BoxEmbedder {
        &self.embedder
    }

    async fn store(&self, document: &VectorDocument) -> Result<(), MemoryError> {
        super::batch::validate_vector(document, self.capabilities.max_vector_dimensions)?;
        self.before_write().await?;
        self.insert(&[document]);
        Ok(())
    }

    async fn store_batch(&self, documents: &[VectorDocument]) -> BatchResult {
        write_in_sub_batches(
            &self.name,
            documents,
            self.capabilities.max_batch_size,
            self.capabilities.max_vector_dimensions,
            |chunk| async move {
                self.before_write().await?;
                self.insert(&chunk);
                Ok(())
            },
        )
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), MemoryError> {
        self.before_write().await?;
        self.remove(&[id.to_string()]);
        Ok(())
    }

    async fn delete_batch(&self, ids: &[String]) -> BatchResult {
        delete_in_sub_batches(&self.name, ids, self.capabilities.max_batch_size, |chunk| async move {
            self.before_write().await?;
            self.remove(chunk);
            Ok(())
        })
        .await
    }

    async fn delete_by_meeting_id(&self, meeting_id: &str) -> BatchResult {
        let ids: Vec<String> = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.metadata.meeting_id == meeting_id)
            .map(|d| d.id.clone())
            .collect();
        self.delete_batch(&ids).await
    }

    async fn update_metadata(&self, id: &str, metadata: &VectorMetadata) -> Result<(), MemoryError> {
        self.before_write().await?;
        let mut map = self.documents.lock().unwrap();
        match map.get_mut(id) {
            Some(document) => {
                document.metadata = metadata.clone();
                Ok(())
            }
            None => Err(MemoryError::InvalidInput(format!("no document '{id}'"))),
        }
    }

    async fn search(&self, query_vector: &[f32], options: &SearchOptions) -> Result<Vec<SearchResult>, MemoryError> {
        let map = self.documents.lock().unwrap();
        let hits = map
            .values()
            .filter(|d| options.filter.as_ref().is_none_or(|f| f.matches(&d.metadata)))
            .map(|d| SearchResult {
                id: d.id.clone(),
                score: cosine_similarity(query_vector, &d.vector),
                metadata: d.metadata.clone(),
                vector: Some(d.vector.clone()),
            })
            .collect();
        Ok(finalize_results(hits, options))
    }

    async fn health_check(&self) -> HealthStatus {
        let healthy = !self.fail_writes.load(Ordering::SeqCst);
        HealthStatus {
            healthy,
            provider: self.name.clone(),
            latency_ms: 0.0,
            error: (!healthy).then(|| "writes disabled".to_string()),
        }
    }

    async fn get_vector_count(&self) -> Result<u64, MemoryError> {
        Ok(self.len() as u64)
    }

    async fn fetch(&self, id: &str) -> Result<Option<VectorDocument>, MemoryError> {
        Ok(self.get(id))
    }

    async fn list_documents(
        &self,
        filter: Option<&SearchFilter>,
        page_token: Option<&str>,
        page_size: usize,
    ) -> Result<DocumentPage, MemoryError> {
        let start: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| MemoryError::InvalidInput(format!("bad page token '{token}'")))?,
            None => 0,
        };
        let map = self.documents.lock().unwrap();
        let matching: Vec<&VectorDocument> = map
            .values()
            .filter(|d| filter.is_none_or(|f| f.matches(&d.metadata)))
            .collect();
        let end = (start + page_size.max(1)).min(matching.len());
        let documents = matching[start.min(end)..end].iter().map(|d| (*d).clone()).collect();
        Ok(DocumentPage {
            documents,
            next_token: (end < matching.len()).then(|| end.to_string()),
        })
    }
}
