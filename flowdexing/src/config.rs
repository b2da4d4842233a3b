use derive_more::Display;
use ethers::types::Address;

use crate::chains::Chain;
use crate::FlowdexingRepo;

#[derive(Debug, Display)]
pub enum ConfigError {
    #[display("at least one chain must be configured")]
    NoChains,
    #[display("chain {_0} is configured more than once")]
    DuplicateChain(u64),
    #[display("chain {_0} has an invalid registry contract address")]
    InvalidRegistryAddress(u64),
    #[display("chain {_0} has an invalid json-rpc url")]
    InvalidRpcUrl(u64),
}

/// Indexer configuration: the store, the chains to scan, and the metadata
/// backfill settings.
#[derive(Clone)]
pub struct Config {
    pub repo: FlowdexingRepo,
    pub chains: Vec<Chain>,
    /// Base URL of the content-addressed gateway metadata is fetched from.
    pub metadata_endpoint: String,
    pub backfill_interval_ms: u64,
    pub backfill_batch_size: i64,
    /// How long a workflow is skipped after a failed metadata fetch.
    pub meta_retry_cooldown_secs: u64,
    pub metadata_timeout_ms: u64,
    pub rpc_timeout_ms: u64,
    /// Wipe all indexed state once at boot before any worker starts.
    pub fresh_start: bool,
}

impl Config {
    pub fn new(repo: FlowdexingRepo) -> Self {
        Self {
            repo,
            chains: vec![],
            metadata_endpoint: "https://ipfs.io/ipfs".to_string(),
            backfill_interval_ms: 60_000,
            backfill_batch_size: 10,
            meta_retry_cooldown_secs: 300,
            metadata_timeout_ms: 30_000,
            rpc_timeout_ms: 30_000,
            fresh_start: false,
        }
    }

    pub fn add_chain(mut self, chain: Chain) -> Self {
        self.chains.push(chain);

        self
    }

    pub fn with_metadata_endpoint(mut self, metadata_endpoint: &str) -> Self {
        self.metadata_endpoint = metadata_endpoint.to_string();

        self
    }

    pub fn with_backfill_interval_ms(mut self, backfill_interval_ms: u64) -> Self {
        self.backfill_interval_ms = backfill_interval_ms;

        self
    }

    pub fn with_backfill_batch_size(mut self, backfill_batch_size: i64) -> Self {
        self.backfill_batch_size = backfill_batch_size;

        self
    }

    pub fn with_meta_retry_cooldown_secs(mut self, meta_retry_cooldown_secs: u64) -> Self {
        self.meta_retry_cooldown_secs = meta_retry_cooldown_secs;

        self
    }

    pub fn with_metadata_timeout_ms(mut self, metadata_timeout_ms: u64) -> Self {
        self.metadata_timeout_ms = metadata_timeout_ms;

        self
    }

    pub fn with_rpc_timeout_ms(mut self, rpc_timeout_ms: u64) -> Self {
        self.rpc_timeout_ms = rpc_timeout_ms;

        self
    }

    pub fn with_fresh_start(mut self, fresh_start: bool) -> Self {
        self.fresh_start = fresh_start;

        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }

        for (index, chain) in self.chains.iter().enumerate() {
            if self.chains[..index].iter().any(|c| c.id == chain.id) {
                return Err(ConfigError::DuplicateChain(chain.id));
            }
            if chain.registry_address.parse::<Address>().is_err() {
                return Err(ConfigError::InvalidRegistryAddress(chain.id));
            }
            if chain.json_rpc_url.parse::<reqwest::Url>().is_err() {
                return Err(ConfigError::InvalidRpcUrl(chain.id));
            }
        }

        Ok(())
    }
}
