//! BoxEmbedder -- object-safe dynamic dispatch wrapper for EmbeddingProvider.
//!
//! 1. Define an object-safe `EmbeddingProviderDyn` trait with boxed futures
//! 2. Blanket-impl `EmbeddingProviderDyn` for all `T: EmbeddingProvider`
//! 3. `BoxEmbedder` wraps `Box<dyn EmbeddingProviderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use huddle_types::error::MemoryError;

use super::embedder::EmbeddingProvider;

/// Object-safe version of [`EmbeddingProvider`] with boxed futures.
pub trait EmbeddingProviderDyn: Send + Sync {
    fn name_dyn(&self) -> &str;

    fn dimensions_dyn(&self) -> usize;

    fn generate_embedding_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, MemoryError>> + Send + 'a>>;

    fn generate_embeddings_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, MemoryError>> + Send + 'a>>;
}

impl<T: EmbeddingProvider> EmbeddingProviderDyn for T {
    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn dimensions_dyn(&self) -> usize {
        self.dimensions()
    }

    fn generate_embedding_boxed<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, MemoryError>> + Send + 'a>> {
        Box::pin(self.generate_embedding(text))
    }

    fn generate_embeddings_boxed<'a>(
        &'a self,
        texts: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, MemoryError>> + Send + 'a>> {
        Box::pin(self.generate_embeddings(texts))
    }
}

/// Type-erased embedding provider selected at runtime.
///
/// Vector store providers hold an `Arc<BoxEmbedder>` so that both sides of
/// a dual-write setup can share one embedder.
pub struct BoxEmbedder {
    inner: Box<dyn EmbeddingProviderDyn + Send + Sync>,
}

impl BoxEmbedder {
    pub fn new<T: EmbeddingProvider + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name_dyn()
    }

    pub fn dimensions(&self) -> usize {
        self.inner.dimensions_dyn()
    }

    pub async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        self.inner.generate_embedding_boxed(text).await
    }

    pub async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        self.inner.generate_embeddings_boxed(texts).await
    }
}

impl std::fmt::Debug for BoxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxEmbedder")
            .field("name", &self.name())
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::test_support::FakeEmbedder;

    #[tokio::test]
    async fn test_box_embedder_delegates() {
        let boxed = BoxEmbedder::new(FakeEmbedder::new(16));
        assert_eq!(boxed.name(), "fake");
        assert_eq!(boxed.dimensions(), 16);

        let vector = boxed.generate_embedding("hello world").await.unwrap();
        assert_eq!(vector.len(), 16);

        let batch = boxed
            .generate_embeddings(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
    }
}
