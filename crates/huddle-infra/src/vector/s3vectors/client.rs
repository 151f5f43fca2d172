//! SigV4-signed HTTP client for the S3 Vectors JSON API.

use serde::Serialize;
use serde::de::DeserializeOwned;

use huddle_types::error::MemoryError;

use super::api::{
    DeleteVectorsRequest, GetVectorsRequest, GetVectorsResponse, ListVectorsRequest, ListVectorsResponse,
    PutVectorsRequest, QueryVectorsRequest, QueryVectorsResponse, S3VectorsApi,
};
use crate::aws::AwsCredentials;
use crate::aws::sigv4::signed_json_post;
use crate::http::{build_client, check_status, decode_json, transport_error};

const PROVIDER: &str = "s3-vectors";
const SIGNING_SERVICE: &str = "s3vectors";

/// Each operation is a `POST {endpoint}/{OperationName}` with a JSON body.
///
/// Does not derive `Debug` so credentials cannot leak through logging.
pub struct HttpS3VectorsClient {
    http: reqwest::Client,
    credentials: AwsCredentials,
    region: String,
    base_url: String,
}

impl HttpS3VectorsClient {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>) -> Result<Self, MemoryError> {
        let region = region.into();
        Ok(Self {
            http: build_client()?,
            credentials,
            base_url: format!("https://s3vectors.{region}.api.aws"),
            region,
        })
    }

    /// Send requests to a different endpoint (VPC endpoint, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn post<Req: Serialize>(&self, operation: &str, request: &Req) -> Result<reqwest::Response, MemoryError> {
        let url = format!("{}/{operation}", self.base_url);
        let body = serde_json::to_vec(request)
            .map_err(|e| MemoryError::InvalidInput(format!("failed to encode {operation} request: {e}")))?;
        tracing::debug!(url = %url, operation = %operation, "S3 Vectors request");

        let response = signed_json_post(&self.http, &url, body, &self.credentials, &self.region, SIGNING_SERVICE)?
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        check_status(PROVIDER, &url, response).await
    }

    async fn call<Req: Serialize, Resp: DeserializeOwned>(&self, operation: &str, request: &Req) -> Result<Resp, MemoryError> {
        let response = self.post(operation, request).await?;
        decode_json(PROVIDER, response).await
    }
}

impl S3VectorsApi for HttpS3VectorsClient {
    async fn put_vectors(&self, request: PutVectorsRequest) -> Result<(), MemoryError> {
        self.post("PutVectors", &request).await?;
        Ok(())
    }

    async fn delete_vectors(&self, request: DeleteVectorsRequest) -> Result<(), MemoryError> {
        self.post("DeleteVectors", &request).await?;
        Ok(())
    }

    async fn list_vectors(&self, request: ListVectorsRequest) -> Result<ListVectorsResponse, MemoryError> {
        self.call("ListVectors", &request).await
    }

    async fn query_vectors(&self, request: QueryVectorsRequest) -> Result<QueryVectorsResponse, MemoryError> {
        self.call("QueryVectors", &request).await
    }

    async fn get_vectors(&self, request: GetVectorsRequest) -> Result<GetVectorsResponse, MemoryError> {
        self.call("GetVectors", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::s3vectors::api::VectorData;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpS3VectorsClient {
        let credentials = AwsCredentials::new("AKIDEXAMPLE", SecretString::from("secret".to_string()), None);
        HttpS3VectorsClient::new(credentials, "us-west-2")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_default_endpoint() {
        let credentials = AwsCredentials::new("AKIDEXAMPLE", SecretString::from("secret".to_string()), None);
        let client = HttpS3VectorsClient::new(credentials, "eu-west-1").unwrap();
        assert_eq!(client.base_url, "https://s3vectors.eu-west-1.api.aws");
        assert_eq!(client.region(), "eu-west-1");
    }

    #[tokio::test]
    async fn test_query_is_signed_and_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/QueryVectors"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(body_partial_json(json!({"vectorBucketName": "bucket", "topK": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "vectors": [{"key": "m1_chunk_0000", "distance": 0.25, "metadata": {"meeting_id": "m1"}}],
                "distanceMetric": "cosine"
            })))
            .mount(&server)
            .await;

        let response = client(&server)
            .query_vectors(QueryVectorsRequest {
                vector_bucket_name: "bucket".to_string(),
                index_name: "index".to_string(),
                query_vector: VectorData { float32: vec![1.0, 0.0] },
                top_k: 3,
                filter: None,
                return_metadata: true,
                return_distance: true,
            })
            .await
            .unwrap();
        assert_eq!(response.vectors.len(), 1);
        assert_eq!(response.vectors[0].distance, Some(0.25));

        let received = server.received_requests().await.unwrap();
        let auth = received[0].headers.get("authorization").unwrap().to_str().unwrap();
        assert!(auth.contains("/us-west-2/s3vectors/aws4_request"));
    }

    #[tokio::test]
    async fn test_error_status_maps_to_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/DeleteVectors"))
            .respond_with(ResponseTemplate::new(404).set_body_string("NotFoundException"))
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_vectors(DeleteVectorsRequest {
                vector_bucket_name: "bucket".to_string(),
                index_name: "index".to_string(),
                keys: vec!["a".to_string()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Http { status: 404, .. }));
    }
}
