//! Business logic and provider trait definitions for Huddle.
//!
//! This crate defines the "ports" that the infrastructure layer implements
//! (`EmbeddingProvider`, `VectorStoreProvider`) together with the logic that
//! only composes them: transcript chunking, meeting aggregation, dual-write
//! replication, the process-wide provider registry and migration checks.
//! It depends only on `huddle-types` -- never on `huddle-infra` or any
//! HTTP client.

pub mod memory;
