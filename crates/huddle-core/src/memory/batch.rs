//! Shared write and search bookkeeping for backend adapters.
//!
//! Adapters hand their wire calls to these helpers so that sub-batching,
//! per-item validation, failure accounting and result post-processing
//! behave identically across backends.

use std::future::Future;

use huddle_types::error::MemoryError;
use huddle_types::memory::{BatchResult, SearchOptions, SearchResult, VectorDocument};

/// Reject vectors a backend cannot hold: empty ones and those longer than
/// `max_dimensions`.
pub fn validate_vector(document: &VectorDocument, max_dimensions: usize) -> Result<(), MemoryError> {
    if document.vector.is_empty() {
        return Err(MemoryError::InvalidInput(format!(
            "document '{}' has an empty vector",
            document.id
        )));
    }
    if document.vector.len() > max_dimensions {
        return Err(MemoryError::InvalidInput(format!(
            "document '{}' has {} dimensions, backend maximum is {max_dimensions}",
            document.id,
            document.vector.len()
        )));
    }
    Ok(())
}

/// Validate `documents` and write the valid ones in sub-batches of at most
/// `max_batch_size`.
///
/// Invalid documents are recorded as individual failures and never sent.
/// When a sub-batch write fails, every document in it is recorded as
/// failed with the same error; other sub-batches are still attempted.
pub async fn write_in_sub_batches<'a, F, Fut>(
    provider: &str,
    documents: &'a [VectorDocument],
    max_batch_size: usize,
    max_dimensions: usize,
    mut write: F,
) -> BatchResult
where
    F: FnMut(Vec<&'a VectorDocument>) -> Fut,
    Fut: Future<Output = Result<(), MemoryError>>,
{
    let mut result = BatchResult::default();
    let mut valid = Vec::with_capacity(documents.len());
    for document in documents {
        match validate_vector(document, max_dimensions) {
            Ok(()) => valid.push(document),
            Err(e) => result.record_failure(&document.id, e.to_string()),
        }
    }

    for chunk in valid.chunks(max_batch_size.max(1)) {
        match write(chunk.to_vec()).await {
            Ok(()) => result.successful += chunk.len(),
            Err(e) => {
                tracing::warn!(
                    provider = %provider,
                    batch_size = chunk.len(),
                    error = %e,
                    "Sub-batch write failed"
                );
                result.merge(BatchResult::all_failed(
                    chunk.iter().map(|d| d.id.as_str()),
                    &e.to_string(),
                ));
            }
        }
    }
    result
}

/// Delete `ids` in sub-batches of at most `max_batch_size`, with the same
/// failure accounting as [`write_in_sub_batches`].
pub async fn delete_in_sub_batches<'a, F, Fut>(
    provider: &str,
    ids: &'a [String],
    max_batch_size: usize,
    mut delete: F,
) -> BatchResult
where
    F: FnMut(&'a [String]) -> Fut,
    Fut: Future<Output = Result<(), MemoryError>>,
{
    let mut result = BatchResult::default();
    for chunk in ids.chunks(max_batch_size.max(1)) {
        match delete(chunk).await {
            Ok(()) => result.successful += chunk.len(),
            Err(e) => {
                tracing::warn!(
                    provider = %provider,
                    batch_size = chunk.len(),
                    error = %e,
                    "Sub-batch delete failed"
                );
                result.merge(BatchResult::all_failed(
                    chunk.iter().map(String::as_str),
                    &e.to_string(),
                ));
            }
        }
    }
    result
}

/// Apply the search contract to raw backend hits: drop scores below
/// `min_score`, sort by descending score, keep `top_k`, and strip vectors
/// unless they were requested.
pub fn finalize_results(mut results: Vec<SearchResult>, options: &SearchOptions) -> Vec<SearchResult> {
    if let Some(min_score) = options.min_score {
        results.retain(|r| r.score >= min_score);
    }
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
    results.truncate(options.top_k);
    if !options.include_vector {
        for result in &mut results {
            result.vector = None;
        }
    }
    results
}
