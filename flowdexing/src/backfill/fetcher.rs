use std::time::Duration;

use derive_more::Display;
use reqwest::StatusCode;

#[derive(Debug, Display)]
pub enum FetchError {
    #[display("no metadata found for {_0}")]
    NotFound(String),
    #[display("transient fetch error: {_0}")]
    Transient(String),
}

/// Resolves a workflow's content hash to its metadata document.
#[async_trait::async_trait]
pub trait MetadataFetcher: Sync + Send {
    async fn fetch(&self, ipfs_hash: &str) -> Result<serde_json::Value, FetchError>;
}

/// Fetches metadata from a content-addressed HTTP gateway.
pub struct HttpMetadataFetcher {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder().timeout(timeout).build().unwrap(),
        }
    }
}

#[async_trait::async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, ipfs_hash: &str) -> Result<serde_json::Value, FetchError> {
        // A malformed hash can never resolve, so it is not worth a request.
        if !is_valid_cid(ipfs_hash) {
            return Err(FetchError::NotFound(ipfs_hash.to_string()));
        }

        let url = format!("{}/{ipfs_hash}", self.endpoint);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| FetchError::Transient(error.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(ipfs_hash.to_string()));
        }

        response
            .error_for_status()
            .map_err(|error| FetchError::Transient(error.to_string()))?
            .json()
            .await
            .map_err(|error| FetchError::Transient(error.to_string()))
    }
}

/// CIDv0 (`Qm` + 44 base58 chars) or CIDv1 (`bafy` + 55 alphanumerics).
pub fn is_valid_cid(hash: &str) -> bool {
    let is_base58 =
        |c: char| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l');

    (hash.len() == 46 && hash.starts_with("Qm") && hash.chars().all(is_base58))
        || (hash.len() == 59
            && hash.starts_with("bafy")
            && hash.chars().all(|c| c.is_ascii_alphanumeric()))
}
