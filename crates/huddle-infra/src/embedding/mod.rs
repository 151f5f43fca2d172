//! Embedding provider implementations.

pub mod bedrock;
pub mod ruvector;

pub use bedrock::BedrockEmbeddingProvider;
pub use ruvector::RuvectorEmbeddingProvider;
