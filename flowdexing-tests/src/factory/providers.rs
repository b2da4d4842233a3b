use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ethers::providers::ProviderError;
use ethers::types::{Block, Filter, Log, TransactionReceipt, TxHash, H160, H256, U256, U64};
use flowdexing::Provider;

/// Canned JSON-RPC node: a settable head, logs served by block range and
/// receipts served by transaction hash. Blocks get deterministic timestamps
/// derived from their number.
#[derive(Clone, Default)]
pub struct FakeProvider {
    head: Arc<AtomicU64>,
    logs: Arc<Mutex<Vec<Log>>>,
    receipts: Arc<Mutex<HashMap<H256, TransactionReceipt>>>,
    requested_filters: Arc<Mutex<Vec<Filter>>>,
    fail_next_head: Arc<AtomicBool>,
}

pub const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

impl FakeProvider {
    pub fn new(head: u64) -> Self {
        let provider = Self::default();
        provider.head.store(head, Ordering::SeqCst);

        provider
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn add_log(&self, log: Log) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn add_receipt(&self, transaction_hash: H256, receipt: TransactionReceipt) {
        self.receipts.lock().unwrap().insert(transaction_hash, receipt);
    }

    pub fn fail_next_head(&self) {
        self.fail_next_head.store(true, Ordering::SeqCst);
    }

    pub fn requested_filters(&self) -> Vec<Filter> {
        self.requested_filters.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for FakeProvider {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        if self.fail_next_head.swap(false, Ordering::SeqCst) {
            return Err(ProviderError::CustomError("node unavailable".to_string()));
        }

        Ok(self.head.load(Ordering::SeqCst).into())
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        self.requested_filters.lock().unwrap().push(filter.clone());

        let from = filter.get_from_block().map(|block| block.as_u64()).unwrap_or(0);
        let to = filter.get_to_block().map(|block| block.as_u64()).unwrap_or(u64::MAX);

        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| {
                log.block_number
                    .map(|block| (from..=to).contains(&block.as_u64()))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn get_block(&self, block_number: U64) -> Result<Option<Block<TxHash>>, ProviderError> {
        Ok(Some(Block {
            number: Some(block_number),
            timestamp: U256::from(GENESIS_TIMESTAMP + block_number.as_u64()),
            ..Default::default()
        }))
    }

    async fn get_transaction_receipt(
        &self,
        transaction_hash: H256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        Ok(self.receipts.lock().unwrap().get(&transaction_hash).cloned())
    }
}

pub fn run_receipt(from: &str, gas_used: u64, gas_price: u64) -> TransactionReceipt {
    TransactionReceipt {
        from: H160::from_str(from).unwrap(),
        gas_used: Some(gas_used.into()),
        effective_gas_price: Some(gas_price.into()),
        ..Default::default()
    }
}
