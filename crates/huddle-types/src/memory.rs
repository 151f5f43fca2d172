//! Vector memory types for Huddle.
//!
//! These types model transcript chunks as they travel through the vector
//! layer: the stored document and its metadata, the search request and its
//! results, and the accounting returned by batch writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of characters of chunk text retained in stored metadata.
pub const MAX_SNIPPET_CHARS: usize = 500;

/// Speaker label stored when no speaker is known.
pub const UNKNOWN_SPEAKER: &str = "unknown";

/// Number of snippets kept per meeting in aggregated search results.
pub const MAX_MEETING_SNIPPETS: usize = 3;

/// Metadata attached to every stored vector.
///
/// `(meeting_id, chunk_index)` is unique within a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub meeting_id: String,
    /// Locator of the source transcript (object key).
    pub s3_key: String,
    /// Position of this chunk within the meeting's chunk sequence.
    pub chunk_index: u32,
    pub speaker: Option<String>,
    /// Display snippet; truncated to [`MAX_SNIPPET_CHARS`] when stored.
    pub text: Option<String>,
    /// Tenant scope.
    pub user_id: Option<String>,
}

impl VectorMetadata {
    /// Create metadata for a chunk with no speaker, text or tenant.
    pub fn new(meeting_id: impl Into<String>, s3_key: impl Into<String>, chunk_index: u32) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            s3_key: s3_key.into(),
            chunk_index,
            speaker: None,
            text: None,
            user_id: None,
        }
    }

    /// Flatten into the string map both backends persist.
    ///
    /// A missing speaker is written as `"unknown"`, the text is truncated
    /// to [`MAX_SNIPPET_CHARS`] characters, and `user_id` is omitted when absent.
    pub fn to_storage_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("meeting_id".to_string(), self.meeting_id.clone());
        map.insert("s3_key".to_string(), self.s3_key.clone());
        map.insert("chunk_index".to_string(), self.chunk_index.to_string());
        map.insert(
            "speaker".to_string(),
            self.speaker
                .clone()
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string()),
        );
        map.insert(
            "text".to_string(),
            truncate_chars(self.text.as_deref().unwrap_or(""), MAX_SNIPPET_CHARS).to_string(),
        );
        if let Some(user_id) = &self.user_id {
            map.insert("user_id".to_string(), user_id.clone());
        }
        map
    }

    /// Rebuild metadata from a backend's JSON metadata object.
    ///
    /// Decoding is lenient: missing keys become empty strings, values may be
    /// strings or numbers, and an unparsable `chunk_index` becomes 0.
    pub fn from_storage_value(value: &Value) -> Self {
        let get = |key: &str| -> Option<String> {
            match value.get(key)? {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }
        };

        let chunk_index = get("chunk_index")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(0);

        Self {
            meeting_id: get("meeting_id").unwrap_or_default(),
            s3_key: get("s3_key").unwrap_or_default(),
            chunk_index,
            speaker: get("speaker"),
            text: get("text"),
            user_id: get("user_id"),
        }
    }
}

/// Truncate `text` to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// A vector with its metadata, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorDocument {
    /// Conventional document id for a transcript chunk: `{meeting_id}_chunk_{index:04}`.
    pub fn chunk_id(meeting_id: &str, chunk_index: u32) -> String {
        format!("{meeting_id}_chunk_{chunk_index:04}")
    }
}

/// Equality constraints applied to a search, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    pub meeting_id: Option<String>,
    pub user_id: Option<String>,
    pub speaker: Option<String>,
    /// Inclusive lower date bound (ISO-8601).
    pub date_from: Option<String>,
    /// Inclusive upper date bound (ISO-8601).
    pub date_to: Option<String>,
}

impl SearchFilter {
    /// Filter on a single meeting.
    pub fn meeting(meeting_id: impl Into<String>) -> Self {
        Self {
            meeting_id: Some(meeting_id.into()),
            ..Self::default()
        }
    }

    /// The equality constraints as `(field, value)` pairs, in a stable order.
    pub fn equality_constraints(&self) -> Vec<(&'static str, &str)> {
        let mut constraints = Vec::new();
        if let Some(v) = &self.meeting_id {
            constraints.push(("meeting_id", v.as_str()));
        }
        if let Some(v) = &self.user_id {
            constraints.push(("user_id", v.as_str()));
        }
        if let Some(v) = &self.speaker {
            constraints.push(("speaker", v.as_str()));
        }
        constraints
    }

    /// Whether the metadata satisfies every equality constraint.
    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        self.equality_constraints()
            .into_iter()
            .all(|(field, value)| match field {
                "meeting_id" => metadata.meeting_id == value,
                "user_id" => metadata.user_id.as_deref() == Some(value),
                "speaker" => metadata.speaker.as_deref() == Some(value),
                _ => true,
            })
    }
}

/// Options for a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub filter: Option<SearchFilter>,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    #[serde(default)]
    pub include_vector: bool,
    /// Lower score bound applied after the query.
    #[serde(default)]
    pub min_score: Option<f32>,
}

fn default_top_k() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            filter: None,
            include_metadata: true,
            include_vector: false,
            min_score: None,
        }
    }
}

impl SearchOptions {
    /// Default options with a different `top_k`.
    pub fn top_k(top_k: usize) -> Self {
        Self {
            top_k,
            ..Self::default()
        }
    }

    /// Builder-style filter setter.
    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Builder-style minimum score setter.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }
}

/// A single chunk-level search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    /// Similarity, higher is closer. Exact semantics are backend defined.
    pub score: f32,
    pub metadata: VectorMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

/// Chunk hits collapsed into one result per meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSearchResult {
    pub meeting_id: String,
    pub s3_key: String,
    /// Maximum score among the meeting's matching chunks.
    pub score: f32,
    pub matching_chunks: usize,
    /// Texts of up to [`MAX_MEETING_SNIPPETS`] highest-scoring chunks.
    pub snippets: Vec<String>,
}

/// Why a single item of a batch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    pub id: String,
    pub error: String,
}

/// Outcome of a batch write or delete.
///
/// Invariant: `successful + failed` equals the number of input items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub successful: usize,
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchError>,
}

impl BatchResult {
    /// A batch where every one of `count` items succeeded.
    pub fn succeeded(count: usize) -> Self {
        Self {
            successful: count,
            failed: 0,
            errors: Vec::new(),
        }
    }

    /// A batch where every id failed with the same reason.
    pub fn all_failed<'a>(ids: impl IntoIterator<Item = &'a str>, error: &str) -> Self {
        let errors: Vec<BatchError> = ids
            .into_iter()
            .map(|id| BatchError {
                id: id.to_string(),
                error: error.to_string(),
            })
            .collect();
        Self {
            successful: 0,
            failed: errors.len(),
            errors,
        }
    }

    /// Record one failed item.
    pub fn record_failure(&mut self, id: impl Into<String>, error: impl Into<String>) {
        self.failed += 1;
        self.errors.push(BatchError {
            id: id.into(),
            error: error.into(),
        });
    }

    /// Fold another sub-batch result into this one.
    pub fn merge(&mut self, other: BatchResult) {
        self.successful += other.successful;
        self.failed += other.failed;
        self.errors.extend(other.errors);
    }

    /// Total number of items accounted for.
    pub fn total(&self) -> usize {
        self.successful + self.failed
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Result of a provider health probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub provider: String,
    pub latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Static declaration of what a backend supports.
///
/// Callers branch on these flags instead of catching
/// [`MemoryError::Unsupported`](crate::error::MemoryError::Unsupported).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub max_vector_dimensions: usize,
    pub max_batch_size: usize,
    pub supports_filtering: bool,
    pub supports_metadata: bool,
    pub supports_deletion: bool,
    pub supports_update: bool,
    pub supports_count: bool,
    pub supports_listing: bool,
}

/// One page of stored documents, as returned by a listing call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPage {
    pub documents: Vec<VectorDocument>,
    /// Continuation token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}
