//! Wire types for the RuVector REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use huddle_types::memory::{SearchFilter, VectorDocument};

#[derive(Debug, Serialize)]
pub struct CreateCollectionRequest<'a> {
    pub name: &'a str,
    pub dimensions: usize,
    pub distance_metric: &'static str,
}

/// A vector as written to the server.
#[derive(Debug, Serialize)]
pub struct WireVector<'a> {
    pub id: &'a str,
    pub vector: &'a [f32],
    pub metadata: BTreeMap<String, String>,
}

impl<'a> From<&'a VectorDocument> for WireVector<'a> {
    fn from(document: &'a VectorDocument) -> Self {
        Self {
            id: &document.id,
            vector: &document.vector,
            metadata: document.metadata.to_storage_map(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchUpsertRequest<'a> {
    pub vectors: Vec<WireVector<'a>>,
}

#[derive(Debug, Serialize)]
pub struct DeleteIdsRequest<'a> {
    pub ids: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFilter<'a> {
    pub field: &'static str,
    pub value: &'a str,
}

/// Either a single equality clause or a conjunction of clauses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireFilter<'a> {
    Field(FieldFilter<'a>),
    And { and: Vec<FieldFilter<'a>> },
}

impl<'a> WireFilter<'a> {
    /// `None` when the filter carries no equality constraints.
    pub fn from_search_filter(filter: &'a SearchFilter) -> Option<Self> {
        let mut clauses: Vec<FieldFilter<'a>> = filter
            .equality_constraints()
            .into_iter()
            .map(|(field, value)| FieldFilter { field, value })
            .collect();
        match clauses.len() {
            0 => None,
            1 => clauses.pop().map(WireFilter::Field),
            _ => Some(WireFilter::And { and: clauses }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteByFilterRequest<'a> {
    pub filter: WireFilter<'a>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteByFilterResponse {
    #[serde(default)]
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct UpdateMetadataRequest {
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct QueryRequest<'a> {
    pub vector: &'a [f32],
    pub top_k: usize,
    pub include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<WireFilter<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_vectors: bool,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<QueryHit>,
}

#[derive(Debug, Deserialize)]
pub struct QueryHit {
    pub id: String,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// A stored vector as returned by `GET /collections/{c}/vectors/{id}`.
#[derive(Debug, Deserialize)]
pub struct StoredVector {
    pub id: String,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Deserialize)]
pub struct StatsResponse {
    #[serde(default)]
    pub vector_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_clause_filter_is_flat() {
        let filter = SearchFilter::meeting("m1");
        let wire = WireFilter::from_search_filter(&filter).unwrap();
        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            serde_json::json!({"field": "meeting_id", "value": "m1"})
        );
    }

    #[test]
    fn test_multiple_clauses_are_anded() {
        let filter = SearchFilter {
            meeting_id: Some("m1".to_string()),
            speaker: Some("Alice".to_string()),
            ..SearchFilter::default()
        };
        let wire = WireFilter::from_search_filter(&filter).unwrap();
        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            serde_json::json!({"and": [
                {"field": "meeting_id", "value": "m1"},
                {"field": "speaker", "value": "Alice"}
            ]})
        );
    }

    #[test]
    fn test_empty_filter_is_omitted() {
        let filter = SearchFilter {
            date_from: Some("2026-01-01".to_string()),
            ..SearchFilter::default()
        };
        assert!(WireFilter::from_search_filter(&filter).is_none());
    }

    #[test]
    fn test_query_request_skips_unset_fields() {
        let request = QueryRequest {
            vector: &[0.5, 0.5],
            top_k: 3,
            include_metadata: true,
            filter: None,
            include_vectors: false,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"vector": [0.5, 0.5], "top_k": 3, "include_metadata": true})
        );
    }
}
