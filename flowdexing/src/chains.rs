/// Per-chain indexing configuration for one EVM network.
///
/// Scan progress is persisted in the store; `start_block_number` only seeds
/// `last_processed_block` the first time a chain is seen.
///
/// # Example
/// ```
/// use flowdexing::Chain;
///
/// Chain::new(137, "https://polygon-mainnet.g.alchemy.com/v2/...", "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984")
///     .with_batch_size(50)
///     .with_block_delay(2);
/// ```
#[derive(Clone, Debug)]
pub struct Chain {
    /// Global numeric chain id, e.g. 1 for Ethereum mainnet.
    pub id: u64,
    pub json_rpc_url: String,
    /// Address of the workflow registry contract on this chain.
    pub registry_address: String,
    /// Block to start scanning from when the chain has no persisted progress.
    pub start_block_number: u64,
    /// Maximum number of blocks fetched per poll cycle.
    pub batch_size: u64,
    /// Safety lag behind the chain head, to avoid indexing blocks that are
    /// still likely to be reorganized.
    pub block_delay: u64,
    pub poll_interval_ms: u64,
    /// Maximum block lag still reported as "synced".
    pub sync_threshold: u64,
}

impl Chain {
    pub fn new(id: u64, json_rpc_url: &str, registry_address: &str) -> Self {
        Self {
            id,
            json_rpc_url: json_rpc_url.to_string(),
            registry_address: registry_address.to_string(),
            start_block_number: 0,
            batch_size: 50,
            block_delay: 2,
            poll_interval_ms: 10_000,
            sync_threshold: 100,
        }
    }

    pub fn with_start_block_number(mut self, start_block_number: u64) -> Self {
        self.start_block_number = start_block_number;

        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;

        self
    }

    pub fn with_block_delay(mut self, block_delay: u64) -> Self {
        self.block_delay = block_delay;

        self
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;

        self
    }

    pub fn with_sync_threshold(mut self, sync_threshold: u64) -> Self {
        self.sync_threshold = sync_threshold;

        self
    }
}
