//! The S3 Vectors operations this crate uses, as a trait seam.
//!
//! [`HttpS3VectorsClient`](super::HttpS3VectorsClient) is the production
//! implementation; tests substitute an in-memory fake.

use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use huddle_types::error::MemoryError;
use huddle_types::memory::SearchFilter;

/// `{"float32": [...]}` vector payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorData {
    pub float32: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PutInputVector {
    pub key: String,
    pub data: VectorData,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub vectors: Vec<PutInputVector>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    pub return_data: bool,
    pub return_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub query_vector: VectorData,
    pub top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub return_metadata: bool,
    pub return_distance: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetVectorsRequest {
    pub vector_bucket_name: String,
    pub index_name: String,
    pub keys: Vec<String>,
    pub return_data: bool,
    pub return_metadata: bool,
}

/// A vector as returned by `ListVectors` and `GetVectors`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutputVector {
    pub key: String,
    #[serde(default)]
    pub data: Option<VectorData>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListVectorsResponse {
    #[serde(default)]
    pub vectors: Vec<OutputVector>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryOutputVector {
    pub key: String,
    #[serde(default)]
    pub distance: Option<f32>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryVectorsResponse {
    #[serde(default)]
    pub vectors: Vec<QueryOutputVector>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetVectorsResponse {
    #[serde(default)]
    pub vectors: Vec<OutputVector>,
}

/// Metadata filter document: `{"field": {"$eq": value}, ...}`, implicitly ANDed.
pub fn metadata_filter(filter: &SearchFilter) -> Option<Value> {
    let constraints = filter.equality_constraints();
    if constraints.is_empty() {
        return None;
    }
    let map: Map<String, Value> = constraints
        .into_iter()
        .map(|(field, value)| (field.to_string(), json!({ "$eq": value })))
        .collect();
    Some(Value::Object(map))
}

/// The subset of the S3 Vectors data-plane API used by
/// [`S3VectorsProvider`](super::S3VectorsProvider).
pub trait S3VectorsApi: Send + Sync {
    fn put_vectors(&self, request: PutVectorsRequest) -> impl Future<Output = Result<(), MemoryError>> + Send;

    fn delete_vectors(&self, request: DeleteVectorsRequest) -> impl Future<Output = Result<(), MemoryError>> + Send;

    fn list_vectors(
        &self,
        request: ListVectorsRequest,
    ) -> impl Future<Output = Result<ListVectorsResponse, MemoryError>> + Send;

    fn query_vectors(
        &self,
        request: QueryVectorsRequest,
    ) -> impl Future<Output = Result<QueryVectorsResponse, MemoryError>> + Send;

    fn get_vectors(
        &self,
        request: GetVectorsRequest,
    ) -> impl Future<Output = Result<GetVectorsResponse, MemoryError>> + Send;
}
