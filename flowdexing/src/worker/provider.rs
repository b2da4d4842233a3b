use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Middleware, Provider as EthersProvider, ProviderError};
use ethers::types::{Block, Filter, Log, TransactionReceipt, TxHash, H256, U64};
use futures_util::future::try_join_all;

/// The slice of a JSON-RPC node the chain worker depends on. Implemented
/// for the real HTTP provider and for canned providers in tests.
#[async_trait::async_trait]
pub trait Provider: Clone + Sync + Send {
    async fn get_block_number(&self) -> Result<U64, ProviderError>;
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError>;
    async fn get_block(&self, block_number: U64) -> Result<Option<Block<TxHash>>, ProviderError>;
    async fn get_transaction_receipt(
        &self,
        transaction_hash: H256,
    ) -> Result<Option<TransactionReceipt>, ProviderError>;

    async fn get_block_timestamps(
        &self,
        block_numbers: Vec<U64>,
    ) -> Result<HashMap<U64, i64>, ProviderError> {
        let mut timestamps = HashMap::new();

        for chunk in block_numbers.chunks(4) {
            let blocks =
                try_join_all(chunk.iter().map(|block_number| self.get_block(*block_number)))
                    .await?;

            for (block_number, block) in chunk.iter().zip(blocks) {
                if let Some(block) = block {
                    timestamps.insert(*block_number, block.timestamp.as_u64() as i64);
                }
            }
        }

        Ok(timestamps)
    }
}

#[async_trait::async_trait]
impl Provider for Arc<EthersProvider<Http>> {
    async fn get_block_number(&self) -> Result<U64, ProviderError> {
        Middleware::get_block_number(&**self).await
    }

    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ProviderError> {
        Middleware::get_logs(&**self, filter).await
    }

    async fn get_block(&self, block_number: U64) -> Result<Option<Block<TxHash>>, ProviderError> {
        Middleware::get_block(&**self, block_number).await
    }

    async fn get_transaction_receipt(
        &self,
        transaction_hash: H256,
    ) -> Result<Option<TransactionReceipt>, ProviderError> {
        Middleware::get_transaction_receipt(&**self, transaction_hash).await
    }
}

pub fn get(json_rpc_url: &str, timeout: Duration) -> Arc<EthersProvider<Http>> {
    // The url was validated by `Config::validate` before any worker starts.
    let url: reqwest::Url = json_rpc_url.parse().unwrap();
    let client = reqwest::Client::builder().timeout(timeout).build().unwrap();

    Arc::new(EthersProvider::new(Http::new_with_client(url, client)))
}
