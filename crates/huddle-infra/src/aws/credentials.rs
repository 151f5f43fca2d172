use secrecy::{ExposeSecret, SecretString};

use crate::config::EnvLookup;

pub const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";
pub const BEDROCK_BEARER_TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

/// Static AWS credentials used for SigV4 signing.
///
/// The secret key and session token are held as [`SecretString`] and never
/// appear in `Debug` output.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: SecretString, session_token: Option<SecretString>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            session_token,
        }
    }

    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN`. `None` unless both keys are present.
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Option<Self> {
        let access_key_id = lookup(ACCESS_KEY_ID_ENV)?;
        let secret = lookup(SECRET_ACCESS_KEY_ENV)?;
        Some(Self::new(
            access_key_id,
            SecretString::from(secret),
            lookup(SESSION_TOKEN_ENV).map(SecretString::from),
        ))
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    pub(crate) fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|t| t.expose_secret())
    }
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// How requests to Bedrock are authenticated.
#[derive(Clone)]
pub enum BedrockAuth {
    /// A Bedrock API key sent as a bearer token.
    Bearer(SecretString),
    /// SigV4 with static credentials.
    SigV4(AwsCredentials),
}

impl BedrockAuth {
    /// Prefer a Bedrock bearer key, fall back to static credentials.
    pub fn from_lookup(lookup: EnvLookup<'_>) -> Option<Self> {
        if let Some(token) = lookup(BEDROCK_BEARER_TOKEN_ENV) {
            return Some(BedrockAuth::Bearer(SecretString::from(token)));
        }
        AwsCredentials::from_lookup(lookup).map(BedrockAuth::SigV4)
    }
}

impl std::fmt::Debug for BedrockAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BedrockAuth::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            BedrockAuth::SigV4(credentials) => f.debug_tuple("SigV4").field(credentials).finish(),
        }
    }
}
