use thiserror::Error;

/// Errors raised by embedding providers, vector store providers and the
/// provider factory.
///
/// Partial batch failures are never represented here: they are reported
/// per item in [`BatchResult::errors`](crate::memory::BatchResult).
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Unknown provider type or missing/invalid required configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A provider type that is declared in configuration but has no implementation.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The backend does not provide this capability.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    /// Network failure or timeout talking to a backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MemoryError {
    /// Shorthand for an [`MemoryError::Unsupported`] error.
    pub fn unsupported(provider: impl Into<String>, operation: &'static str) -> Self {
        MemoryError::Unsupported {
            provider: provider.into(),
            operation,
        }
    }
}
