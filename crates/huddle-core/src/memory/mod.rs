//! Vector memory for meeting transcripts.
//!
//! - `EmbeddingProvider` / `BoxEmbedder`: text to vector conversion
//! - `VectorStoreProvider` / `BoxVectorStore`: one implementation per backend
//! - `DualWriteProvider`: replicates writes to a secondary backend during migration
//! - `registry`: the process-wide provider instance
//! - `migrate`: export, import and cross-backend validation over the provider contract

pub mod aggregate;
pub mod batch;
pub mod box_embedder;
pub mod box_provider;
pub mod chunker;
pub mod dual;
pub mod embedder;
pub mod migrate;
pub mod provider;
pub mod registry;
pub mod transcript;

#[cfg(test)]
pub(crate) mod test_support;
