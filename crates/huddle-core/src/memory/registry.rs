//! Process-wide vector store instance.
//!
//! The factory builds the provider once; every later caller shares it.
//! Tests and reconfiguration can replace or clear it.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use huddle_types::error::MemoryError;

use super::box_provider::BoxVectorStore;

static PROVIDER: RwLock<Option<Arc<BoxVectorStore>>> = RwLock::new(None);

fn read() -> RwLockReadGuard<'static, Option<Arc<BoxVectorStore>>> {
    PROVIDER.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write() -> RwLockWriteGuard<'static, Option<Arc<BoxVectorStore>>> {
    PROVIDER.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Return the shared provider, building it with `init` on first use.
///
/// Concurrent first calls build exactly one instance. When `init` fails
/// nothing is stored and the next call tries again.
pub fn get_or_try_init<F>(init: F) -> Result<Arc<BoxVectorStore>, MemoryError>
where
    F: FnOnce() -> Result<BoxVectorStore, MemoryError>,
{
    if let Some(provider) = read().as_ref() {
        return Ok(Arc::clone(provider));
    }

    let mut slot = write();
    if let Some(provider) = slot.as_ref() {
        return Ok(Arc::clone(provider));
    }
    let provider = Arc::new(init()?);
    tracing::info!(provider = %provider.name(), "Vector store provider initialized");
    *slot = Some(Arc::clone(&provider));
    Ok(provider)
}

/// The shared provider, if one has been initialized.
pub fn current() -> Option<Arc<BoxVectorStore>> {
    read().clone()
}

/// Replace the shared provider, returning the previous one.
pub fn set(provider: BoxVectorStore) -> Option<Arc<BoxVectorStore>> {
    tracing::debug!(provider = %provider.name(), "Vector store provider replaced");
    write().replace(Arc::new(provider))
}

/// Clear the shared provider, returning it so the caller can shut it down.
pub fn reset() -> Option<Arc<BoxVectorStore>> {
    write().take()
}
