use diesel::{Insertable, Queryable};
use ethers::types::TransactionReceipt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diesel::schema::flowdexing_events;
use crate::registry::EventKind;

/// One observed registry event, normalized into a log record. Append-only:
/// a record represents a historical fact and is never updated.
#[derive(Debug, Deserialize, Clone, PartialEq, Queryable, Insertable)]
#[diesel(table_name = flowdexing_events)]
pub struct WorkflowEvent {
    pub id: Uuid,
    pub event: String,
    pub chain_id: i64,
    pub block_number: i64,
    pub transaction_hash: String,
    pub ipfs_hash: String,
    pub job_id: Option<String>,
    pub nonce: Option<String>,
    /// Block timestamp, seconds since epoch.
    pub timestamp: i64,
    pub receipt: Option<serde_json::Value>,
    pub inserted_at: chrono::NaiveDateTime,
}

impl WorkflowEvent {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        kind: EventKind,
        chain_id: u64,
        block_number: u64,
        transaction_hash: String,
        ipfs_hash: String,
        job_id: Option<String>,
        nonce: Option<String>,
        timestamp: i64,
        receipt: Option<&RunReceipt>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event: kind.as_str().to_string(),
            chain_id: chain_id as i64,
            block_number: block_number as i64,
            transaction_hash,
            ipfs_hash,
            job_id,
            nonce,
            timestamp,
            receipt: receipt.map(|r| serde_json::to_value(r).unwrap()),
            inserted_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Gas details of the transaction that emitted a `Run` event. Enrichment
/// only; a record without a receipt is still valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReceipt {
    pub gas_used: Option<String>,
    pub gas_price: Option<String>,
    pub from: String,
}

impl From<&TransactionReceipt> for RunReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            gas_used: receipt.gas_used.map(|gas| gas.to_string()),
            gas_price: receipt.effective_gas_price.map(|price| price.to_string()),
            from: hashes::h160_to_string(&receipt.from),
        }
    }
}

pub(crate) mod hashes {
    use ethers::types::{H160, H256};

    // Debug renders the full lowercase 0x hex; Display abbreviates with an
    // ellipsis.
    pub fn h160_to_string(h160: &H160) -> String {
        format!("{h160:?}")
    }

    pub fn h256_to_string(h256: &H256) -> String {
        format!("{h256:?}")
    }
}
