//! Infrastructure implementations for Huddle.
//!
//! Concrete backends for the traits defined in `huddle-core`: the managed
//! S3 Vectors store, the self-hosted RuVector store and model server, and
//! Bedrock Titan embeddings. Also holds configuration loading and the
//! provider factory that wires them together.

pub mod aws;
pub mod config;
pub mod embedding;
pub mod factory;
pub(crate) mod http;
pub mod vector;
