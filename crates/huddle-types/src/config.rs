//! Provider configuration types for Huddle.
//!
//! `ProviderConfig` is a single struct covering every backend variant. It is
//! loaded from `config.toml` and/or environment variables by `huddle-infra`
//! and resolved into a concrete provider graph by the factory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

/// Vector store backend selector.
///
/// `AbRouter` and `Mock` are accepted by the parser but have no
/// implementation; the factory rejects them with `NotImplemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Managed cloud backend (AWS S3 Vectors).
    #[serde(rename = "s3-vectors", alias = "managed")]
    S3Vectors,
    /// Self-hosted HTTP backend (RuVector).
    #[serde(rename = "ruvector", alias = "self-hosted")]
    Ruvector,
    /// Dual-write wrapper over a primary and a secondary backend.
    #[serde(rename = "dual")]
    Dual,
    #[serde(rename = "ab-router")]
    AbRouter,
    #[serde(rename = "mock")]
    Mock,
}

impl Default for ProviderKind {
    fn default() -> Self {
        ProviderKind::S3Vectors
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::S3Vectors => write!(f, "s3-vectors"),
            ProviderKind::Ruvector => write!(f, "ruvector"),
            ProviderKind::Dual => write!(f, "dual"),
            ProviderKind::AbRouter => write!(f, "ab-router"),
            ProviderKind::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3-vectors" | "managed" => Ok(ProviderKind::S3Vectors),
            "ruvector" | "self-hosted" => Ok(ProviderKind::Ruvector),
            "dual" => Ok(ProviderKind::Dual),
            "ab-router" => Ok(ProviderKind::AbRouter),
            "mock" => Ok(ProviderKind::Mock),
            other => Err(MemoryError::Config(format!(
                "invalid memory provider '{other}': must be one of s3-vectors, ruvector, dual, ab-router, mock"
            ))),
        }
    }
}

/// Embedding backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmbeddingKind {
    /// AWS Bedrock Titan text embeddings.
    #[serde(rename = "bedrock")]
    Bedrock,
    /// The self-hosted backend's built-in ONNX embeddings.
    #[serde(rename = "ruvector", alias = "self-hosted")]
    Ruvector,
}

impl Default for EmbeddingKind {
    fn default() -> Self {
        EmbeddingKind::Bedrock
    }
}

impl fmt::Display for EmbeddingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmbeddingKind::Bedrock => write!(f, "bedrock"),
            EmbeddingKind::Ruvector => write!(f, "ruvector"),
        }
    }
}

impl FromStr for EmbeddingKind {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bedrock" => Ok(EmbeddingKind::Bedrock),
            "ruvector" | "self-hosted" => Ok(EmbeddingKind::Ruvector),
            other => Err(MemoryError::Config(format!(
                "invalid embedding provider '{other}': must be bedrock or ruvector"
            ))),
        }
    }
}

/// Which side of a dual-write pair a configuration describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualRole {
    Primary,
    Secondary,
}

impl fmt::Display for DualRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DualRole::Primary => write!(f, "primary"),
            DualRole::Secondary => write!(f, "secondary"),
        }
    }
}

/// Configuration for every vector store variant.
///
/// All fields have sensible defaults so an empty `config.toml` is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub embedding: EmbeddingKind,

    /// S3 Vectors bucket.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// S3 Vectors index.
    #[serde(default = "default_index_name")]
    pub index_name: String,
    #[serde(default = "default_region")]
    pub region: String,

    /// Self-hosted backend base URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Model used by the self-hosted backend's `/embed` endpoint.
    #[serde(default = "default_ruvector_model")]
    pub ruvector_model: String,
    /// Vector length produced by `ruvector_model`.
    #[serde(default = "default_ruvector_dimensions")]
    pub ruvector_dimensions: usize,

    /// Upper bound on documents per backend write call.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Bedrock embedding model id.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    #[serde(default = "default_primary_provider")]
    pub primary_provider: ProviderKind,
    #[serde(default = "default_secondary_provider")]
    pub secondary_provider: ProviderKind,

    /// Full override for the dual-write primary side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<Box<ProviderConfig>>,
    /// Full override for the dual-write secondary side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Box<ProviderConfig>>,
}

fn default_bucket() -> String {
    "huddle-vectors".to_string()
}

fn default_index_name() -> String {
    "transcript-chunks".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_collection() -> String {
    "transcript-chunks".to_string()
}

fn default_ruvector_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_ruvector_dimensions() -> usize {
    384
}

fn default_max_batch_size() -> usize {
    100
}

fn default_embedding_model() -> String {
    "amazon.titan-embed-text-v2:0".to_string()
}

fn default_embedding_dimensions() -> usize {
    1024
}

fn default_primary_provider() -> ProviderKind {
    ProviderKind::S3Vectors
}

fn default_secondary_provider() -> ProviderKind {
    ProviderKind::Ruvector
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            embedding: EmbeddingKind::default(),
            bucket: default_bucket(),
            index_name: default_index_name(),
            region: default_region(),
            endpoint: default_endpoint(),
            collection: default_collection(),
            ruvector_model: default_ruvector_model(),
            ruvector_dimensions: default_ruvector_dimensions(),
            max_batch_size: default_max_batch_size(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            primary_provider: default_primary_provider(),
            secondary_provider: default_secondary_provider(),
            primary: None,
            secondary: None,
        }
    }
}

impl ProviderConfig {
    /// Default configuration for a given backend.
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Configuration for one side of a dual-write pair.
    ///
    /// An explicit `[primary]` / `[secondary]` table wins. Otherwise the side
    /// inherits every field of this configuration with `provider` set to
    /// `primary_provider` / `secondary_provider`.
    pub fn side(&self, role: DualRole) -> ProviderConfig {
        let (explicit, kind) = match role {
            DualRole::Primary => (&self.primary, self.primary_provider),
            DualRole::Secondary => (&self.secondary, self.secondary_provider),
        };

        match explicit {
            Some(side) => (**side).clone(),
            None => ProviderConfig {
                provider: kind,
                primary: None,
                secondary: None,
                ..self.clone()
            },
        }
    }

    /// Check required fields for the selected backend.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self.max_batch_size == 0 {
            return Err(MemoryError::Config(
                "max_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.embedding_dimensions == 0 || self.ruvector_dimensions == 0 {
            return Err(MemoryError::Config(
                "embedding dimensions must be greater than zero".to_string(),
            ));
        }
        match self.provider {
            ProviderKind::S3Vectors => {
                require("bucket", &self.bucket)?;
                require("index_name", &self.index_name)?;
                require("region", &self.region)?;
            }
            ProviderKind::Ruvector => {
                require("endpoint", &self.endpoint)?;
                require("collection", &self.collection)?;
            }
            ProviderKind::Dual | ProviderKind::AbRouter | ProviderKind::Mock => {}
        }
        if self.embedding == EmbeddingKind::Ruvector {
            require("endpoint", &self.endpoint)?;
        }
        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), MemoryError> {
    if value.trim().is_empty() {
        Err(MemoryError::Config(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}
