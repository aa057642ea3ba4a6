//! S3-compatible blob store.
//!
//! Stores and retrieves blobs through the S3 REST API with AWS Signature
//! V4 authentication, using only pure-Rust dependencies (`hmac`, `sha2`)
//! for signing. A custom endpoint URL supports S3-compatible services
//! (MinIO, LocalStack).
//!
//! # Configuration
//!
//! ```toml
//! [blob]
//! backend = "s3"
//! bucket = "acme-documents"
//! prefix = "ingest/"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_SESSION_TOKEN` (optional, for temporary credentials / IAM roles)

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::blob::{BlobError, BlobStore};
use crate::config::BlobConfig;

type HmacSha256 = Hmac<Sha256>;

/// Blob store backed by an S3 bucket.
///
/// Credentials are read from the environment per request, so rotating them
/// does not require restarting the service.
pub struct S3BlobStore {
    bucket: String,
    prefix: String,
    region: String,
    endpoint_url: Option<String>,
    client: reqwest::Client,
}

impl S3BlobStore {
    pub fn new(config: &BlobConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            anyhow::bail!("[blob] backend \"s3\" requires a bucket");
        }
        Ok(Self {
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
            client: reqwest::Client::new(),
        })
    }

    /// Scheme and host for the configured bucket. A custom `endpoint_url`
    /// (MinIO, LocalStack) replaces `<bucket>.s3.<region>.amazonaws.com`
    /// and keeps its own scheme.
    fn scheme_and_host(&self) -> (&'static str, String) {
        match self.endpoint_url {
            Some(ref endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                (scheme, host)
            }
            None => (
                "https",
                format!("{}.s3.{}.amazonaws.com", self.bucket, self.region),
            ),
        }
    }

    /// Full object key for a blob name, under the configured prefix.
    fn object_key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), name)
        }
    }

    /// Send one SigV4-signed request. `key` of `None` targets the bucket
    /// root (listing); `query` must be unencoded key/value pairs.
    async fn send_signed(
        &self,
        method: &str,
        key: Option<&str>,
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<reqwest::Response, BlobError> {
        let creds = AwsCredentials::from_env()?;
        let (scheme, host) = self.scheme_and_host();

        let canonical_uri = match key {
            Some(k) => format!(
                "/{}",
                k.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
            ),
            None => "/".to_string(),
        };

        let mut sorted_query: Vec<(&str, &str)> = query.to_vec();
        sorted_query.sort_by(|a, b| a.0.cmp(b.0));
        let canonical_querystring: String = sorted_query
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = hex_sha256(&body);

        let mut headers = vec![
            ("host".to_string(), host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method, canonical_uri, canonical_querystring, canonical_headers, signed_headers,
            payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key =
            derive_signing_key(&creds.secret_access_key, &date_stamp, &self.region, "s3");
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            creds.access_key_id, credential_scope, signed_headers, signature
        );

        let url = if canonical_querystring.is_empty() {
            format!("{}://{}{}", scheme, host, canonical_uri)
        } else {
            format!("{}://{}{}?{}", scheme, host, canonical_uri, canonical_querystring)
        };

        let mut req = match method {
            "PUT" => self.client.put(&url).body(body),
            _ => self.client.get(&url),
        };
        req = req
            .header("Authorization", &authorization)
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-date", &amz_date);
        if let Some(ref token) = creds.session_token {
            req = req.header("x-amz-security-token", token);
        }

        req.send()
            .await
            .map_err(|e| BlobError::Unavailable(format!("s3://{}: {}", self.bucket, e)))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(&self, name: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let key = self.object_key(name);
        let resp = self.send_signed("PUT", Some(&key), &[], bytes.to_vec()).await?;
        if !resp.status().is_success() {
            return Err(BlobError::Unavailable(format!(
                "S3 PutObject failed (HTTP {}) for key '{}'",
                resp.status(),
                key
            )));
        }
        Ok(name.to_string())
    }

    async fn fetch(&self, blob_ref: &str) -> Result<Vec<u8>, BlobError> {
        let key = self.object_key(blob_ref);
        let resp = self.send_signed("GET", Some(&key), &[], Vec::new()).await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BlobError::NotFound(blob_ref.to_string()));
        }
        if !resp.status().is_success() {
            return Err(BlobError::Unavailable(format!(
                "S3 GetObject failed (HTTP {}) for key '{}'",
                resp.status(),
                key
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| BlobError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn probe(&self) -> Result<(), BlobError> {
        // ListObjectsV2 with max-keys=1: cheap, and succeeds only when the
        // bucket is reachable and the credentials are accepted.
        let resp = self
            .send_signed("GET", None, &[("list-type", "2"), ("max-keys", "1")], Vec::new())
            .await?;
        if !resp.status().is_success() {
            return Err(BlobError::Unavailable(format!(
                "S3 ListObjectsV2 failed (HTTP {}) for bucket '{}'",
                resp.status(),
                self.bucket
            )));
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "s3"
    }
}

// ============ AWS Credentials ============

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self, BlobError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            BlobError::Unavailable("AWS_ACCESS_KEY_ID environment variable not set".to_string())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            BlobError::Unavailable(
                "AWS_SECRET_ACCESS_KEY environment variable not set".to_string(),
            )
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

// ============ AWS SigV4 Helpers ============

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256.
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986 (used in SigV4 canonical requests).
///
/// Encodes all characters except unreserved characters:
/// `A-Z a-z 0-9 - _ . ~`
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
