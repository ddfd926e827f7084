//! Content-addressed storage client
//!
//! Uploads produce a content id (CID). URIs are built from the CID alone so
//! they can be computed before the content is reachable on a gateway.

use crate::config::StorageConfig;
use crate::tx_builder::MinterError;
use async_trait::async_trait;
use reqwest::{multipart, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// One file to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// JSON document, e.g. off-chain metadata
    pub fn json<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self, MinterError> {
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| MinterError::internal(format!("metadata serialization: {}", e)))?;
        Ok(Self::new(name, bytes, "application/json"))
    }

    /// Read a local file, guessing the mime type from its extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let mime_type = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => "application/json",
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("svg") => "image/svg+xml",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        };
        Ok(Self::new(name, bytes, mime_type))
    }
}

/// URIs for a file under a CID
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentUri {
    pub ipfs: String,
    pub http: String,
}

/// Build both URI forms for `file` under `cid`
pub fn cid_to_uri(cid: &str, file: &str, gateway_host: &str) -> ContentUri {
    ContentUri {
        ipfs: format!("ipfs://{}/{}", cid, file),
        http: format!("https://{}.{}/{}", cid, gateway_host, file),
    }
}

/// [`cid_to_uri`] for every file in an upload
pub fn file_list_to_uris(cid: &str, files: &[UploadFile], gateway_host: &str) -> Vec<ContentUri> {
    files
        .iter()
        .map(|file| cid_to_uri(cid, &file.name, gateway_host))
        .collect()
}

/// Content-addressed upload
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Upload `files` as one directory and return its CID
    async fn upload(&self, files: &[UploadFile]) -> Result<String, MinterError>;
}

#[derive(Debug, Deserialize)]
struct UploadValue {
    cid: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    ok: bool,
    #[serde(default)]
    value: Option<UploadValue>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// nft.storage upload API
#[derive(Debug, Clone)]
pub struct NftStorageClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl NftStorageClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, MinterError> {
        if api_key.trim().is_empty() {
            return Err(MinterError::configuration("storage API key is empty"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MinterError::configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Missing API key is a configuration error
    pub fn from_config(config: &StorageConfig) -> Result<Self, MinterError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| MinterError::configuration("NFT_STORAGE_API_KEY is not set"))?;
        Self::new(&config.api_url, api_key, Duration::from_secs(60))
    }

    fn form(files: &[UploadFile]) -> Result<multipart::Form, MinterError> {
        files.iter().try_fold(multipart::Form::new(), |form, file| {
            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| MinterError::internal(format!("mime type {}: {}", file.mime_type, e)))?;
            Ok(form.part("file", part))
        })
    }
}

#[async_trait]
impl ContentStore for NftStorageClient {
    async fn upload(&self, files: &[UploadFile]) -> Result<String, MinterError> {
        if files.is_empty() {
            return Err(MinterError::internal("nothing to upload"));
        }
        let url = format!("{}/upload", self.api_url);
        debug!(url = %url, files = files.len(), "Uploading to content store");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(Self::form(files)?)
            .send()
            .await
            .map_err(|e| MinterError::rpc("upload", e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "Content store rejected the API key");
            return Err(MinterError::configuration(format!(
                "NFT_STORAGE_API_KEY rejected (status {})",
                status
            )));
        }
        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| MinterError::rpc("upload", format!("JSON parse error: {}", e)))?;

        match body {
            UploadResponse {
                ok: true,
                value: Some(value),
                ..
            } if status.is_success() => {
                info!(cid = %value.cid, files = files.len(), "Upload complete");
                Ok(value.cid)
            }
            UploadResponse { error, .. } => {
                let detail = error.map(|e| e.to_string()).unwrap_or_default();
                warn!(status = %status, error = %detail, "Upload rejected");
                let message = format!("status {}: {}", status, detail);
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    Err(MinterError::rpc("upload", message))
                } else {
                    Err(MinterError::rpc_permanent("upload", message))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_forms() {
        let uri = cid_to_uri("bafyabc", "asset.json", "ipfs.dweb.link");
        assert_eq!(uri.ipfs, "ipfs://bafyabc/asset.json");
        assert_eq!(uri.http, "https://bafyabc.ipfs.dweb.link/asset.json");

        let files = vec![
            UploadFile::new("a.png", vec![1], "image/png"),
            UploadFile::new("b.json", vec![2], "application/json"),
        ];
        let uris = file_list_to_uris("cid", &files, "gw.example");
        assert_eq!(uris.len(), 2);
        assert_eq!(uris[1].ipfs, "ipfs://cid/b.json");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let config = StorageConfig::default();
        let err = NftStorageClient::from_config(&config).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[tokio::test]
    async fn test_upload_returns_cid() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":true,"value":{"cid":"bafytest"}}"#)
            .create_async()
            .await;

        let client = NftStorageClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let files = vec![UploadFile::new("asset.json", b"{}".to_vec(), "application/json")];
        assert_eq!(client.upload(&files).await.unwrap(), "bafytest");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_api_key_fails_fast() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error":{"name":"HTTPError","message":"Unauthorized"}}"#)
            .create_async()
            .await;

        let client = NftStorageClient::new(&server.url(), "bad", Duration::from_secs(5)).unwrap();
        let files = vec![UploadFile::new("a.json", b"{}".to_vec(), "application/json")];
        let err = client.upload(&files).await.unwrap_err();
        assert!(matches!(err, MinterError::Configuration(_)));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_forbidden_without_json_body_fails_fast() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let client = NftStorageClient::new(&server.url(), "bad", Duration::from_secs(5)).unwrap();
        let files = vec![UploadFile::new("a.json", b"{}".to_vec(), "application/json")];
        let err = client.upload(&files).await.unwrap_err();
        assert_eq!(err.category(), "configuration");
    }

    #[tokio::test]
    async fn test_server_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload")
            .with_status(503)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok":false,"error":{"name":"HTTPError","message":"Unavailable"}}"#)
            .create_async()
            .await;

        let client = NftStorageClient::new(&server.url(), "secret", Duration::from_secs(5)).unwrap();
        let files = vec![UploadFile::new("a.json", b"{}".to_vec(), "application/json")];
        let err = client.upload(&files).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("503"));
    }
}
