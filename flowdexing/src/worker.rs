//! Per-chain polling workers. Each chain gets an independent task that
//! fetches the next block range, processes its logs, and commits the result
//! together with the new scan position.

pub mod error;
mod provider;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use ethers::types::{Log, H256, U64};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::chains::Chain;
use crate::config::Config;
use crate::events::RunReceipt;
use crate::processor;
use crate::registry::{EventKind, RegistryEvents, RegistryFilter};
use crate::repos::{CommitSummary, Repo, RepoError};
use crate::sync_status;
use crate::FlowdexingRepo;

pub use error::CycleError;
pub use provider::Provider;

/// What one poll cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub head: u64,
    /// Inclusive block range committed this cycle, if the chain had
    /// anything new to scan.
    pub range: Option<(u64, u64)>,
    pub events: usize,
    pub new_runs: usize,
    pub is_synced: bool,
    pub sync_changed: bool,
}

pub fn start(config: &Config) -> Vec<JoinHandle<()>> {
    config
        .chains
        .iter()
        .cloned()
        .map(|chain| {
            let repo = config.repo.clone();
            let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);

            tokio::spawn(async move {
                let registry = RegistryEvents::new();
                let filter = match RegistryFilter::new(&chain, &registry) {
                    Ok(filter) => filter,
                    Err(error) => {
                        error!(chain_id = chain.id, %error, "chain worker not started");
                        return;
                    }
                };
                let provider = provider::get(&chain.json_rpc_url, rpc_timeout);
                let pool = repo.get_pool(1).await;
                let mut conn = FlowdexingRepo::get_conn(&pool).await;

                let mut poll = interval(Duration::from_millis(chain.poll_interval_ms));
                loop {
                    poll.tick().await;

                    match run_cycle::<FlowdexingRepo, _>(
                        &mut conn, &provider, &registry, &filter, &chain,
                    )
                    .await
                    {
                        Ok(outcome) => {
                            if outcome.sync_changed {
                                info!(
                                    chain_id = chain.id,
                                    is_synced = outcome.is_synced,
                                    "sync status changed"
                                );
                            }
                            if let Some((from, to)) = outcome.range {
                                info!(
                                    chain_id = chain.id,
                                    from,
                                    to,
                                    events = outcome.events,
                                    new_runs = outcome.new_runs,
                                    "committed block range"
                                );
                            }
                        }
                        Err(error) => {
                            error!(chain_id = chain.id, %error, "poll cycle failed");
                        }
                    }
                }
            })
        })
        .collect()
}

/// One poll cycle against one chain. Either the whole cycle lands (events,
/// workflow deltas and the new `last_processed_block` in one commit) or the
/// chain state is left untouched for the next tick to retry.
pub async fn run_cycle<'a, R: Repo, P: Provider>(
    conn: &mut R::Conn<'a>,
    provider: &P,
    registry: &RegistryEvents,
    filter: &RegistryFilter,
    chain: &Chain,
) -> Result<CycleOutcome, CycleError> {
    let state = R::get_chain_state(conn, chain.id as i64).await?.ok_or_else(|| {
        CycleError::Commit(RepoError::Unknown(format!("chain {} is not seeded", chain.id)))
    })?;

    let head = provider.get_block_number().await?.as_u64();
    let target = head.saturating_sub(chain.block_delay);
    let last = state.last_processed_block.max(0) as u64;

    let mut range = None;
    let mut summary = CommitSummary::default();
    let mut last_processed_block = state.last_processed_block;

    if last < target {
        let from = last + 1;
        let to = (from + chain.batch_size).min(target);

        let logs = provider.get_logs(&filter.between(from, to)).await?;
        let block_numbers: BTreeSet<U64> =
            logs.iter().filter_map(|log| log.block_number).collect();
        let timestamps =
            provider.get_block_timestamps(block_numbers.into_iter().collect()).await?;
        let receipts = fetch_run_receipts(provider, registry, &logs).await;

        let batch = processor::process(&logs, registry, chain.id, &timestamps, &receipts)?;
        summary = R::commit_batch(conn, chain.id as i64, &batch, to as i64).await?;

        last_processed_block = to as i64;
        range = Some((from, to));
    }

    let is_synced = sync_status::is_synced(head, last_processed_block, chain.sync_threshold);
    let sync_changed = is_synced != state.is_synced;
    if sync_changed {
        R::update_sync_status(conn, chain.id as i64, is_synced).await?;
    }

    Ok(CycleOutcome {
        head,
        range,
        events: summary.events,
        new_runs: summary.new_runs,
        is_synced,
        sync_changed,
    })
}

/// Receipt lookups for Run logs. A failed or missing receipt only loses the
/// enrichment for that one event; the cycle itself still commits.
async fn fetch_run_receipts<P: Provider>(
    provider: &P,
    registry: &RegistryEvents,
    logs: &[Log],
) -> HashMap<H256, RunReceipt> {
    let run_topic = registry.topic_of(EventKind::Run);
    let transaction_hashes: BTreeSet<H256> = logs
        .iter()
        .filter(|log| log.removed != Some(true) && log.topics.first() == Some(&run_topic))
        .filter_map(|log| log.transaction_hash)
        .collect();

    let mut receipts = HashMap::new();
    for transaction_hash in transaction_hashes {
        match provider.get_transaction_receipt(transaction_hash).await {
            Ok(Some(receipt)) => {
                receipts.insert(transaction_hash, RunReceipt::from(&receipt));
            }
            Ok(None) => {}
            Err(error) => {
                warn!(?transaction_hash, %error, "receipt unavailable for run event");
            }
        }
    }

    receipts
}
