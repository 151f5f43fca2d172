//! Provider factory: resolves a [`ProviderConfig`] into a concrete
//! embedder and vector store graph.
//!
//! Dual-write configurations are resolved one level deep; each side may be
//! configured independently but may not itself be a dual provider.

use std::sync::Arc;

use huddle_core::memory::box_embedder::BoxEmbedder;
use huddle_core::memory::box_provider::BoxVectorStore;
use huddle_core::memory::dual::DualWriteProvider;
use huddle_core::memory::registry;
use huddle_types::config::{DualRole, EmbeddingKind, ProviderConfig, ProviderKind};
use huddle_types::error::MemoryError;

use crate::aws::{AwsCredentials, BedrockAuth};
use crate::config::{EnvLookup, process_env};
use crate::embedding::{BedrockEmbeddingProvider, RuvectorEmbeddingProvider};
use crate::vector::{RuvectorProvider, S3VectorsProvider};

/// Build the embedding provider selected by `config.embedding`.
pub fn create_embedding_provider(
    config: &ProviderConfig,
    lookup: EnvLookup<'_>,
) -> Result<Arc<BoxEmbedder>, MemoryError> {
    let embedder = match config.embedding {
        EmbeddingKind::Bedrock => {
            let auth = BedrockAuth::from_lookup(lookup).ok_or_else(|| {
                MemoryError::Config(
                    "Bedrock embeddings need AWS_BEARER_TOKEN_BEDROCK or AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY"
                        .to_string(),
                )
            })?;
            BoxEmbedder::new(BedrockEmbeddingProvider::new(
                auth,
                config.embedding_model.clone(),
                config.region.clone(),
                config.embedding_dimensions,
            )?)
        }
        EmbeddingKind::Ruvector => BoxEmbedder::new(RuvectorEmbeddingProvider::new(
            &config.endpoint,
            config.ruvector_model.clone(),
            config.ruvector_dimensions,
        )?),
    };
    tracing::debug!(embedder = %embedder.name(), dimensions = embedder.dimensions(), "Embedding provider created");
    Ok(Arc::new(embedder))
}

/// Whether two configurations would build the same embedder.
fn same_embedding(a: &ProviderConfig, b: &ProviderConfig) -> bool {
    if a.embedding != b.embedding {
        return false;
    }
    match a.embedding {
        EmbeddingKind::Bedrock => {
            a.embedding_model == b.embedding_model
                && a.embedding_dimensions == b.embedding_dimensions
                && a.region == b.region
        }
        EmbeddingKind::Ruvector => {
            a.endpoint == b.endpoint
                && a.ruvector_model == b.ruvector_model
                && a.ruvector_dimensions == b.ruvector_dimensions
        }
    }
}

/// Error for provider kinds that are accepted by configuration but cannot
/// be built here.
fn unbuildable(kind: ProviderKind) -> MemoryError {
    match kind {
        ProviderKind::Dual => {
            MemoryError::Config("a dual-write side cannot itself be a dual provider".to_string())
        }
        ProviderKind::AbRouter => MemoryError::NotImplemented(
            "ab-router provider has no implementation; use s3-vectors, ruvector or dual".to_string(),
        ),
        _ => MemoryError::NotImplemented(format!(
            "{kind} provider has no implementation; use s3-vectors or ruvector"
        )),
    }
}

/// Build a single (non-dual) backend around `embedder`.
fn create_backend(
    config: &ProviderConfig,
    embedder: Arc<BoxEmbedder>,
    lookup: EnvLookup<'_>,
) -> Result<BoxVectorStore, MemoryError> {
    match config.provider {
        ProviderKind::S3Vectors => {
            let credentials = AwsCredentials::from_lookup(lookup).ok_or_else(|| {
                MemoryError::Config(
                    "S3 Vectors needs AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY".to_string(),
                )
            })?;
            Ok(BoxVectorStore::new(S3VectorsProvider::new(config, credentials, embedder)?))
        }
        ProviderKind::Ruvector => Ok(BoxVectorStore::new(RuvectorProvider::new(config, embedder)?)),
        other => Err(unbuildable(other)),
    }
}

fn create_dual(config: &ProviderConfig, lookup: EnvLookup<'_>) -> Result<BoxVectorStore, MemoryError> {
    let primary_config = config.side(DualRole::Primary);
    let secondary_config = config.side(DualRole::Secondary);
    for (role, side) in [(DualRole::Primary, &primary_config), (DualRole::Secondary, &secondary_config)] {
        if !matches!(side.provider, ProviderKind::S3Vectors | ProviderKind::Ruvector) {
            return Err(side_error(role, unbuildable(side.provider)));
        }
        side.validate().map_err(|e| side_error(role, e))?;
    }

    let primary_embedder = create_embedding_provider(&primary_config, lookup)?;
    let secondary_embedder = if same_embedding(&primary_config, &secondary_config) {
        Arc::clone(&primary_embedder)
    } else {
        create_embedding_provider(&secondary_config, lookup)?
    };

    let primary = create_backend(&primary_config, primary_embedder, lookup)
        .map_err(|e| side_error(DualRole::Primary, e))?;
    let secondary = create_backend(&secondary_config, secondary_embedder, lookup)
        .map_err(|e| side_error(DualRole::Secondary, e))?;

    Ok(BoxVectorStore::new(DualWriteProvider::new(
        Arc::new(primary),
        Arc::new(secondary),
    )))
}

fn side_error(role: DualRole, err: MemoryError) -> MemoryError {
    match err {
        MemoryError::Config(msg) => MemoryError::Config(format!("{role}: {msg}")),
        MemoryError::NotImplemented(msg) => MemoryError::NotImplemented(format!("{role}: {msg}")),
        other => other,
    }
}

/// Build the vector store described by `config`, reading credentials via `lookup`.
pub fn create_memory_provider_with(
    config: &ProviderConfig,
    lookup: EnvLookup<'_>,
) -> Result<BoxVectorStore, MemoryError> {
    config.validate()?;
    let provider = match config.provider {
        ProviderKind::Dual => create_dual(config, lookup)?,
        ProviderKind::S3Vectors | ProviderKind::Ruvector => {
            let embedder = create_embedding_provider(config, lookup)?;
            create_backend(config, embedder, lookup)?
        }
        other => return Err(unbuildable(other)),
    };
    tracing::info!(provider = %provider.name(), "Vector store provider created");
    Ok(provider)
}

/// [`create_memory_provider_with`] using the process environment.
pub fn create_memory_provider(config: &ProviderConfig) -> Result<BoxVectorStore, MemoryError> {
    create_memory_provider_with(config, &process_env)
}

/// The process-wide provider, created from `config` on first use.
///
/// Later calls return the same instance regardless of `config`; use
/// [`registry::reset`] or [`registry::set`] to replace it.
pub fn get_memory_provider(config: &ProviderConfig) -> Result<Arc<BoxVectorStore>, MemoryError> {
    registry::get_or_try_init(|| create_memory_provider(config))
}
