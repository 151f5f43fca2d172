//! Embedding provider trait for text-to-vector conversion.
//!
//! Implementations (Bedrock Titan, the self-hosted RuVector model server)
//! live in huddle-infra.

use huddle_types::error::MemoryError;
use huddle_types::memory::truncate_chars;

/// Rough characters-per-token ratio used to keep inputs inside a model's
/// token budget without a tokenizer.
pub const CHARS_PER_TOKEN: usize = 4;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait EmbeddingProvider: Send + Sync {
    /// Short provider name used in logs and health reports (e.g. "bedrock").
    fn name(&self) -> &str;

    /// Fixed length of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    fn generate_embedding(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, MemoryError>> + Send;

    /// Embed several texts, returning one vector per input in input order.
    ///
    /// The default embeds sequentially. Backends with a batch endpoint
    /// override this.
    fn generate_embeddings(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, MemoryError>> + Send {
        async move {
            let mut embeddings = Vec::with_capacity(texts.len());
            for text in texts {
                embeddings.push(self.generate_embedding(text).await?);
            }
            Ok(embeddings)
        }
    }
}

/// Truncate `text` so it fits a model limit of `max_tokens`, estimated at
/// [`CHARS_PER_TOKEN`] characters per token.
pub fn truncate_to_token_budget(text: &str, max_tokens: usize) -> &str {
    truncate_chars(text, max_tokens.saturating_mul(CHARS_PER_TOKEN))
}

/// Check that an embedding has the length the provider advertises.
pub fn check_dimensions(embedding: &[f32], expected: usize) -> Result<(), MemoryError> {
    if embedding.len() == expected {
        Ok(())
    } else {
        Err(MemoryError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        })
    }
}
