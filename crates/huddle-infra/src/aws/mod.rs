//! AWS credentials and SigV4 request signing for the managed backends.

mod credentials;
pub mod sigv4;

pub use credentials::{AwsCredentials, BedrockAuth};
