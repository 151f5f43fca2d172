//! AWS Signature Version 4 request signing.
//!
//! Covers what the JSON APIs used here need: header signing of a single
//! request with a fully buffered body. Paths are double-encoded as
//! required for every service except S3 object paths.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use huddle_types::error::MemoryError;

use super::AwsCredentials;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Who signs and for which endpoint.
#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub time: DateTime<Utc>,
}

/// Percent-encode per RFC 3986, leaving only unreserved characters.
pub fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hmac_sha256(key: &[u8], data: &str) -> Result<Vec<u8>, MemoryError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| MemoryError::Config(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derive the per-day signing key.
pub fn signing_key(secret_access_key: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>, MemoryError> {
    let k_date = hmac_sha256(format!("AWS4{secret_access_key}").as_bytes(), date)?;
    let k_region = hmac_sha256(&k_date, region)?;
    let k_service = hmac_sha256(&k_region, service)?;
    hmac_sha256(&k_service, "aws4_request")
}

fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &reqwest::Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &reqwest::Url) -> Result<String, MemoryError> {
    let host = url
        .host_str()
        .ok_or_else(|| MemoryError::Config(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

/// Sign a request and return the headers to add to it (`x-amz-date`,
/// `authorization` and, with temporary credentials, `x-amz-security-token`).
///
/// `headers` are extra headers to include in the signature, such as
/// `content-type`; they must be sent with the request unchanged.
pub fn sign(
    method: &str,
    url: &reqwest::Url,
    headers: &[(&str, &str)],
    body: &[u8],
    params: &SigningParams<'_>,
) -> Result<Vec<(String, String)>, MemoryError> {
    let amz_date = params.time.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.time.format("%Y%m%d").to_string();

    let mut signed: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
        .collect();
    signed.insert("host".to_string(), host_header(url)?);
    signed.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = params.credentials.session_token() {
        signed.insert("x-amz-security-token".to_string(), token.to_string());
    }

    let canonical_headers: String = signed.iter().map(|(k, v)| format!("{k}:{v}\n")).collect();
    let signed_headers = signed.keys().cloned().collect::<Vec<_>>().join(";");

    let canonical_request = [
        method.to_string(),
        canonical_uri(url.path()),
        canonical_query(url),
        canonical_headers,
        signed_headers.clone(),
        format!("{:x}", Sha256::digest(body)),
    ]
    .join("\n");

    let scope = format!("{date}/{}/{}/aws4_request", params.region, params.service);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{:x}",
        Sha256::digest(canonical_request.as_bytes())
    );

    let key = signing_key(
        params.credentials.secret_access_key(),
        &date,
        params.region,
        params.service,
    )?;
    let signature = hex(&hmac_sha256(&key, &string_to_sign)?);

    let mut out = vec![
        ("x-amz-date".to_string(), amz_date),
        (
            "authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                params.credentials.access_key_id()
            ),
        ),
    ];
    if let Some(token) = params.credentials.session_token() {
        out.push(("x-amz-security-token".to_string(), token.to_string()));
    }
    Ok(out)
}

/// Build a signed JSON `POST` to `url`, signed at the current time.
pub(crate) fn signed_json_post(
    client: &reqwest::Client,
    url: &str,
    body: Vec<u8>,
    credentials: &AwsCredentials,
    region: &str,
    service: &str,
) -> Result<reqwest::RequestBuilder, MemoryError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| MemoryError::Config(format!("invalid URL '{url}': {e}")))?;
    let params = SigningParams {
        credentials,
        region,
        service,
        time: Utc::now(),
    };
    let headers = sign("POST", &parsed, &[("content-type", "application/json")], &body, &params)?;

    let mut request = client.post(parsed).header("content-type", "application/json");
    for (name, value) in headers {
        request = request.header(name, value);
    }
    Ok(request.body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use secrecy::SecretString;

    const EXAMPLE_SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";

    #[test]
    fn test_signing_key_matches_aws_example() {
        let key = signing_key(EXAMPLE_SECRET, "20120215", "us-east-1", "iam").unwrap();
        assert_eq!(
            hex(&key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn test_sign_matches_aws_iam_example() {
        let credentials = AwsCredentials::new("AKIDEXAMPLE", SecretString::from(EXAMPLE_SECRET), None);
        let params = SigningParams {
            credentials: &credentials,
            region: "us-east-1",
            service: "iam",
            time: Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap(),
        };
        let url = reqwest::Url::parse("https://iam.amazonaws.com/?Action=ListUsers&Version=2010-05-08").unwrap();

        let headers = sign(
            "GET",
            &url,
            &[("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")],
            b"",
            &params,
        )
        .unwrap();

        assert_eq!(headers[0], ("x-amz-date".to_string(), "20150830T123600Z".to_string()));
        assert_eq!(
            headers[1].1,
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/iam/aws4_request, \
             SignedHeaders=content-type;host;x-amz-date, \
             Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d7"
        );
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_session_token_is_signed_and_returned() {
        let credentials = AwsCredentials::new(
            "AKIDEXAMPLE",
            SecretString::from(EXAMPLE_SECRET),
            Some(SecretString::from("session-token")),
        );
        let params = SigningParams {
            credentials: &credentials,
            region: "us-west-2",
            service: "s3vectors",
            time: Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap(),
        };
        let url = reqwest::Url::parse("https://s3vectors.us-west-2.api.aws/PutVectors").unwrap();

        let headers = sign("POST", &url, &[("content-type", "application/json")], b"{}", &params).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[2], ("x-amz-security-token".to_string(), "session-token".to_string()));
        assert!(headers[1].1.contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token"));
        assert!(headers[1].1.contains("/20250701/us-west-2/s3vectors/aws4_request"));
    }

    #[test]
    fn test_canonical_uri_double_encodes() {
        assert_eq!(canonical_uri("/"), "/");
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(
            canonical_uri("/model/amazon.titan-embed-text-v2%3A0/invoke"),
            "/model/amazon.titan-embed-text-v2%253A0/invoke"
        );
    }

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("a b/c~d"), "a%20b%2Fc~d");
        assert_eq!(uri_encode("amazon.titan-embed-text-v2:0"), "amazon.titan-embed-text-v2%3A0");
    }
}
