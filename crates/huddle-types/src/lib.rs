//! Shared domain types for the Huddle vector-memory layer.
//!
//! This crate contains the data model passed between the transcript pipeline
//! and the vector backends: documents, metadata, search options and results,
//! batch accounting, provider configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod config;
pub mod error;
pub mod memory;
