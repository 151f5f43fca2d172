//! BedrockEmbeddingProvider -- Amazon Titan text embeddings via Bedrock Runtime.
//!
//! Authenticates with a Bedrock API key (bearer token) when one is
//! configured, otherwise signs requests with SigV4. Secrets are only
//! exposed while building request headers.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use huddle_core::memory::embedder::{EmbeddingProvider, check_dimensions, truncate_to_token_budget};
use huddle_types::error::MemoryError;

use crate::aws::sigv4::{signed_json_post, uri_encode};
use crate::aws::{AwsCredentials, BedrockAuth};
use crate::http::{build_client, check_status, decode_json, transport_error};

const PROVIDER: &str = "bedrock";

/// SigV4 service name for Bedrock Runtime.
const SIGNING_SERVICE: &str = "bedrock";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanEmbeddingRequest<'a> {
    input_text: &'a str,
    dimensions: usize,
    normalize: bool,
}

#[derive(Debug, Deserialize)]
struct TitanEmbeddingResponse {
    embedding: Vec<f32>,
}

enum Auth {
    Bearer(SecretString),
    SigV4(AwsCredentials),
}

/// Titan text embedding provider.
///
/// Does not derive `Debug` so credentials cannot leak through logging.
pub struct BedrockEmbeddingProvider {
    client: reqwest::Client,
    auth: Auth,
    region: String,
    model_id: String,
    dimensions: usize,
    base_url: String,
}

impl BedrockEmbeddingProvider {
    /// Prefix used to identify Bedrock API keys.
    const KEY_PREFIX: &'static str = "bedrock-api-key-";

    /// Titan v2 input limit in tokens.
    pub const MAX_INPUT_TOKENS: usize = 8192;

    /// Create a provider for `model_id` in `region`.
    ///
    /// A bearer key may carry its own region in the embedded credential
    /// scope; when it does, that region wins.
    pub fn new(auth: BedrockAuth, model_id: String, region: String, dimensions: usize) -> Result<Self, MemoryError> {
        let (auth, region) = match auth {
            BedrockAuth::Bearer(key) => {
                let raw_key = key.expose_secret();
                let token = raw_key.strip_prefix(Self::KEY_PREFIX).unwrap_or(raw_key);
                let region = Self::detect_region_from_token(token).unwrap_or(region);
                (Auth::Bearer(SecretString::from(token.to_string())), region)
            }
            BedrockAuth::SigV4(credentials) => (Auth::SigV4(credentials), region),
        };

        Ok(Self {
            client: build_client()?,
            base_url: format!("https://bedrock-runtime.{region}.amazonaws.com"),
            auth,
            region,
            model_id,
            dimensions,
        })
    }

    /// Send requests to a different Bedrock Runtime endpoint (VPC endpoint, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Try to extract the AWS region from a base64-encoded presigned URL token.
    ///
    /// The token decodes to a URL carrying
    /// `X-Amz-Credential=<key>/<date>/<region>/bedrock/aws4_request`,
    /// with the slashes possibly percent-encoded.
    fn detect_region_from_token(token: &str) -> Option<String> {
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD.decode(token).ok()?;
        let text = String::from_utf8(decoded).ok()?.replace("%2F", "/").replace("%2f", "/");

        let cred_start = text.find("X-Amz-Credential=")?;
        let cred_value = &text[cred_start + "X-Amz-Credential=".len()..];
        let parts: Vec<&str> = cred_value.split('/').collect();
        if parts.len() >= 3 {
            let region = parts[2].split('&').next().unwrap_or(parts[2]);
            tracing::info!(region = %region, "Detected region from Bedrock bearer token");
            Some(region.to_string())
        } else {
            None
        }
    }

    fn invoke_url(&self) -> String {
        format!("{}/model/{}/invoke", self.base_url, uri_encode(&self.model_id))
    }
}

impl EmbeddingProvider for BedrockEmbeddingProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let body = serde_json::to_vec(&TitanEmbeddingRequest {
            input_text: truncate_to_token_budget(text, Self::MAX_INPUT_TOKENS),
            dimensions: self.dimensions,
            normalize: true,
        })
        .map_err(|e| MemoryError::Embedding(format!("failed to encode request: {e}")))?;
        let url = self.invoke_url();

        tracing::debug!(url = %url, model_id = %self.model_id, chars = text.len(), "Bedrock embedding request");

        let request = match &self.auth {
            Auth::Bearer(token) => self
                .client
                .post(&url)
                .bearer_auth(token.expose_secret())
                .header("content-type", "application/json")
                .body(body),
            Auth::SigV4(credentials) => {
                signed_json_post(&self.client, &url, body, credentials, &self.region, SIGNING_SERVICE)?
            }
        };

        let response = request
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        let response = check_status(PROVIDER, &url, response).await?;
        let parsed: TitanEmbeddingResponse = decode_json(PROVIDER, response).await?;

        check_dimensions(&parsed.embedding, self.dimensions)?;
        Ok(parsed.embedding)
    }
}
