//! Vector store backends.
//!
//! Each backend implements `VectorStoreProvider` from `huddle-core` and is
//! paired with an embedder chosen by the factory.

pub mod ruvector;
pub mod s3vectors;

pub use ruvector::RuvectorProvider;
pub use s3vectors::S3VectorsProvider;
