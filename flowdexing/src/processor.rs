//! Pure transformation of raw event logs into log records and workflow
//! deltas. No store access happens here; everything this module produces is
//! applied in the chain worker's single atomic commit.

use std::collections::{HashMap, HashSet};

use derive_more::Display;
use ethers::abi::{LogParam, Token};
use ethers::types::{Log, H256, U256, U64};

use crate::events::{hashes, RunReceipt, WorkflowEvent};
use crate::registry::{EventKind, RegistryEvents};
use crate::workflows::RunKey;

#[derive(Debug, Display)]
pub enum ParseError {
    #[display("malformed log: {_0}")]
    MalformedLog(String),
    #[display("log is missing the {_0} field")]
    MissingField(&'static str),
    #[display("no timestamp available for block {_0}")]
    MissingBlockTimestamp(u64),
}

/// Everything one fetched batch resolves to. `runs` is already deduplicated
/// within the batch; cross-batch and cross-chain dedup happens at commit
/// time against the run-marker uniqueness constraint.
#[derive(Debug, Clone, Default)]
pub struct ProcessedBatch {
    pub events: Vec<WorkflowEvent>,
    /// Hashes referenced for the first time in this batch, in observation
    /// order. Creating an already-known workflow is a no-op at commit.
    pub new_workflows: Vec<String>,
    pub runs: Vec<RunKey>,
    pub cancellations: Vec<String>,
}

impl ProcessedBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub fn process(
    logs: &[Log],
    registry: &RegistryEvents,
    chain_id: u64,
    block_timestamps: &HashMap<U64, i64>,
    receipts: &HashMap<H256, RunReceipt>,
) -> Result<ProcessedBatch, ParseError> {
    let mut batch = ProcessedBatch::default();
    let mut seen_workflows = HashSet::new();
    let mut seen_runs = HashSet::new();
    let mut seen_cancellations = HashSet::new();

    for log in logs {
        if log.removed == Some(true) {
            continue;
        }
        let Some(kind) = log.topics.first().and_then(|topic0| registry.kind_of(topic0)) else {
            continue;
        };

        let params = registry
            .parse(kind, log)
            .map_err(|error| ParseError::MalformedLog(error.to_string()))?;

        let block_number =
            log.block_number.ok_or(ParseError::MissingField("block_number"))?.as_u64();
        let transaction_hash =
            log.transaction_hash.ok_or(ParseError::MissingField("transaction_hash"))?;
        let timestamp = *block_timestamps
            .get(&block_number.into())
            .ok_or(ParseError::MissingBlockTimestamp(block_number))?;

        let ipfs_hash = string_param(&params, "ipfsHash")?;
        let (job_id, nonce, receipt) = match kind {
            EventKind::Run => (
                Some(uint_param(&params, "jobId")?.to_string()),
                Some(uint_param(&params, "nonce")?.to_string()),
                receipts.get(&transaction_hash),
            ),
            _ => (None, None, None),
        };

        if seen_workflows.insert(ipfs_hash.clone()) {
            batch.new_workflows.push(ipfs_hash.clone());
        }
        match kind {
            EventKind::Run => {
                let key = RunKey {
                    ipfs_hash: ipfs_hash.clone(),
                    // nonce is present for every Run event by construction
                    nonce: nonce.clone().unwrap_or_default(),
                };
                if seen_runs.insert(key.clone()) {
                    batch.runs.push(key);
                }
            }
            EventKind::Cancelled => {
                if seen_cancellations.insert(ipfs_hash.clone()) {
                    batch.cancellations.push(ipfs_hash.clone());
                }
            }
            EventKind::Created => {}
        }

        batch.events.push(WorkflowEvent::new(
            kind,
            chain_id,
            block_number,
            hashes::h256_to_string(&transaction_hash),
            ipfs_hash,
            job_id,
            nonce,
            timestamp,
            receipt,
        ));
    }

    Ok(batch)
}

fn string_param(params: &[LogParam], name: &'static str) -> Result<String, ParseError> {
    param(params, name)?.into_string().ok_or(ParseError::MissingField(name))
}

fn uint_param(params: &[LogParam], name: &'static str) -> Result<U256, ParseError> {
    param(params, name)?.into_uint().ok_or(ParseError::MissingField(name))
}

fn param(params: &[LogParam], name: &'static str) -> Result<Token, ParseError> {
    params
        .iter()
        .find(|param| param.name == name)
        .map(|param| param.value.clone())
        .ok_or(ParseError::MissingField(name))
}
