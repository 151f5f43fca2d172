//! Managed AWS S3 Vectors backend.
//!
//! S3 Vectors has no count or in-place metadata update; both fail fast
//! with `MemoryError::Unsupported`. Listing is paginated and is used for
//! delete-by-meeting and exports.

pub mod api;
mod client;
mod provider;

pub use api::S3VectorsApi;
pub use client::HttpS3VectorsClient;
pub use provider::{MAX_DIMENSIONS, S3VectorsProvider};
