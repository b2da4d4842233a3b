use std::collections::HashMap;
use std::sync::Mutex;

use flowdexing::{FetchError, MetadataFetcher};

/// Canned metadata gateway. Hashes without a stubbed response resolve to
/// `NotFound`.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Result<serde_json::Value, String>>>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, ipfs_hash: &str, meta: serde_json::Value) {
        self.responses.lock().unwrap().insert(ipfs_hash.to_string(), Ok(meta));
    }

    pub fn fail(&self, ipfs_hash: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(ipfs_hash.to_string(), Err("gateway timed out".to_string()));
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetadataFetcher for FakeFetcher {
    async fn fetch(&self, ipfs_hash: &str) -> Result<serde_json::Value, FetchError> {
        self.fetched.lock().unwrap().push(ipfs_hash.to_string());

        match self.responses.lock().unwrap().get(ipfs_hash) {
            Some(Ok(meta)) => Ok(meta.clone()),
            Some(Err(reason)) => Err(FetchError::Transient(reason.clone())),
            None => Err(FetchError::NotFound(ipfs_hash.to_string())),
        }
    }
}
