//! Object storage client.
//!
//! [`S3Store`] uploads with a streamed, SigV4-signed `PUT`. The body is
//! streamed from disk and every chunk handed to the connection advances the
//! artifact's [`UploadProgress`].

use super::checksum::{file_sha256, sha256_hex};
use super::env::Credentials;
use super::progress::UploadProgress;
use crate::error::{ErrorExt, ReleaseError, Result};
use futures_util::StreamExt;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use url::Url;

/// Canned ACL every release artifact is stored with.
pub const PUBLIC_READ: &str = "public-read";

type HmacSha256 = Hmac<Sha256>;

/// Parameters of one upload.
#[derive(Clone, Debug)]
pub struct PutObject {
    /// Local file to stream
    pub source: PathBuf,
    /// Destination bucket
    pub bucket: String,
    /// Destination key
    pub key: String,
    /// Canned ACL
    pub acl: String,
    /// Content type override
    pub content_type: Option<String>,
}

/// Result of a completed upload.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct StoredObject {
    /// Destination key
    pub key: String,
    /// URL the object is reachable at
    pub location: String,
}

/// Uploads files to an object store.
pub trait ObjectStore {
    /// Streams `request.source` to `request.key`, reporting into `progress`.
    fn put_object(
        &self,
        request: &PutObject,
        progress: Arc<UploadProgress>,
    ) -> impl Future<Output = Result<StoredObject>> + Send;
}

/// Amazon S3 (or S3-compatible) store.
#[derive(Clone, Debug)]
pub struct S3Store {
    client: reqwest::Client,
    credentials: Credentials,
    region: String,
    endpoint: Option<Url>,
}

impl S3Store {
    /// Creates a store using virtual-hosted addressing on AWS.
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            region: region.into(),
            endpoint: None,
        }
    }

    /// Uses path-style addressing against `endpoint` instead of AWS hosts.
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self> {
        let url = Url::parse(endpoint).map_err(|e| {
            ReleaseError::Anyhow(anyhow::anyhow!("Invalid storage endpoint {endpoint}: {e}"))
        })?;
        self.endpoint = Some(url);
        Ok(self)
    }

    /// Returns `(url, host, canonical_uri)` for an object.
    fn address(&self, bucket: &str, key: &str) -> Result<(String, String, String)> {
        match &self.endpoint {
            None => {
                let host = if self.region == "us-east-1" {
                    format!("{bucket}.s3.amazonaws.com")
                } else {
                    format!("{bucket}.s3.{}.amazonaws.com", self.region)
                };
                let uri = format!("/{}", uri_encode(key, false));
                Ok((format!("https://{host}{uri}"), host, uri))
            }
            Some(base) => {
                let host_name = base.host_str().ok_or_else(|| {
                    ReleaseError::Anyhow(anyhow::anyhow!("Storage endpoint {base} has no host"))
                })?;
                let host = match base.port() {
                    Some(port) => format!("{host_name}:{port}"),
                    None => host_name.to_string(),
                };
                let uri = format!(
                    "{}/{}/{}",
                    base.path().trim_end_matches('/'),
                    uri_encode(bucket, true),
                    uri_encode(key, false)
                );
                Ok((format!("{}://{host}{uri}", base.scheme()), host, uri))
            }
        }
    }
}

impl ObjectStore for S3Store {
    async fn put_object(
        &self,
        request: &PutObject,
        progress: Arc<UploadProgress>,
    ) -> Result<StoredObject> {
        let upload_error = |reason: String| ReleaseError::Upload {
            key: request.key.clone(),
            reason,
        };

        let total = tokio::fs::metadata(&request.source)
            .await
            .fs_context("reading artifact metadata", &request.source)?
            .len();
        let payload_hash = file_sha256(&request.source).await?;
        let (url, host, uri) = self.address(&request.bucket, &request.key)?;

        let now = chrono::Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers = vec![
            ("host".to_string(), host),
            ("x-amz-acl".to_string(), request.acl.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(content_type) = &request.content_type {
            headers.push(("content-type".to_string(), content_type.clone()));
        }
        headers.sort();

        let authorization = authorization_header(
            &self.credentials,
            &self.region,
            &amz_date,
            &date,
            &uri,
            &headers,
            &payload_hash,
        )?;

        let file = tokio::fs::File::open(&request.source)
            .await
            .fs_context("opening artifact", &request.source)?;
        let mut sent = 0u64;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                progress.record(sent, total);
            }
            chunk
        });

        let mut builder = self
            .client
            .put(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .header(reqwest::header::CONTENT_LENGTH, total);
        for (name, value) in headers.iter().filter(|(name, _)| name != "host") {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|e| upload_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_error(format!("{status}: {}", body.trim())));
        }

        Ok(StoredObject {
            key: request.key.clone(),
            location: url,
        })
    }
}

/// Builds the SigV4 `Authorization` header for a `PUT` with no query string.
///
/// `headers` must be lowercase and sorted by name.
fn authorization_header(
    credentials: &Credentials,
    region: &str,
    amz_date: &str,
    date: &str,
    canonical_uri: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> Result<String> {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "PUT\n{canonical_uri}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );
    let scope = format!("{date}/{region}/s3/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        sha256_hex(&canonical_request)
    );

    let key = signing_key(&credentials.secret_access_key, date, region, "s3")?;
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

    Ok(format!(
        "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
        credentials.access_key_id
    ))
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ReleaseError::Anyhow(anyhow::anyhow!("Invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Derives the SigV4 signing key for a date, region and service.
fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Result<Vec<u8>> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}

/// Percent-encodes a URI path the way SigV4 expects; `/` survives unless
/// `encode_slash` is set.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".into(),
        }
    }

    #[test]
    fn derives_documented_signing_key() {
        let key = signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        )
        .unwrap();
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn encodes_keys_but_keeps_slashes() {
        assert_eq!(
            uri_encode("2.1.0-abc1234/win32/ia32/N1 Setup+.exe", false),
            "2.1.0-abc1234/win32/ia32/N1%20Setup%2B.exe"
        );
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
    }

    #[test]
    fn addresses_virtual_hosted_and_path_style() {
        let store = S3Store::new(credentials(), "us-east-1");
        let (url, host, uri) = store.address("edgehill", "v/darwin/x64/N1.zip").unwrap();
        assert_eq!(host, "edgehill.s3.amazonaws.com");
        assert_eq!(uri, "/v/darwin/x64/N1.zip");
        assert_eq!(url, "https://edgehill.s3.amazonaws.com/v/darwin/x64/N1.zip");

        let store = S3Store::new(credentials(), "eu-west-1");
        let (_, host, _) = store.address("edgehill", "k").unwrap();
        assert_eq!(host, "edgehill.s3.eu-west-1.amazonaws.com");

        let store = S3Store::new(credentials(), "us-east-1")
            .with_endpoint("http://127.0.0.1:9000")
            .unwrap();
        let (url, host, uri) = store.address("edgehill", "k/N1.zip").unwrap();
        assert_eq!(host, "127.0.0.1:9000");
        assert_eq!(uri, "/edgehill/k/N1.zip");
        assert_eq!(url, "http://127.0.0.1:9000/edgehill/k/N1.zip");
    }

    #[test]
    fn authorization_lists_signed_headers() {
        let headers = vec![
            ("content-type".to_string(), "application/x-deb".to_string()),
            ("host".to_string(), "edgehill.s3.amazonaws.com".to_string()),
            ("x-amz-acl".to_string(), PUBLIC_READ.to_string()),
        ];
        let header = authorization_header(
            &credentials(),
            "us-east-1",
            "20240101T000000Z",
            "20240101",
            "/k",
            &headers,
            "UNSIGNED-PAYLOAD",
        )
        .unwrap();
        assert!(header.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240101/us-east-1/s3/aws4_request, "
        ));
        assert!(header.contains("SignedHeaders=content-type;host;x-amz-acl, Signature="));
        let signature = header.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }
}
