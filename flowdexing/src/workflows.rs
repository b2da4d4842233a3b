use diesel::{Insertable, Queryable};
use serde::Deserialize;

use crate::diesel::schema::{flowdexing_run_markers, flowdexing_workflows};

/// Materialized view of one deployed workflow definition, shared across
/// chains and keyed by its content-addressed (IPFS) hash.
#[derive(Debug, Deserialize, Clone, PartialEq, Queryable)]
#[diesel(table_name = flowdexing_workflows)]
pub struct Workflow {
    pub ipfs_hash: String,
    pub has_meta: bool,
    /// Distinct logical executions observed, deduplicated across chains.
    pub runs: i64,
    /// Monotonic: once set it never reverts to false.
    pub is_cancelled: bool,
    pub meta: Option<serde_json::Value>,
    /// Seconds since epoch of the last failed metadata fetch, if any.
    pub last_meta_fetch_failure: Option<i64>,
}

impl Workflow {
    /// Whether the backfill worker should pick this workflow up, given the
    /// cooldown cutoff (`now - meta_retry_cooldown`).
    pub fn backfill_due(&self, cutoff: i64) -> bool {
        !self.has_meta && self.last_meta_fetch_failure.map_or(true, |failed_at| failed_at < cutoff)
    }

    /// Execution budget declared in this workflow's metadata, if any.
    /// Reaching it retires the workflow.
    pub fn execution_count(&self) -> Option<i64> {
        execution_count(self.meta.as_ref())
    }
}

pub fn execution_count(meta: Option<&serde_json::Value>) -> Option<i64> {
    meta?.get("workflow")?.get("count")?.as_i64()
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = flowdexing_workflows)]
pub struct UnsavedWorkflow {
    pub ipfs_hash: String,
    pub has_meta: bool,
    pub runs: i64,
    pub is_cancelled: bool,
}

impl UnsavedWorkflow {
    pub fn new(ipfs_hash: &str) -> Self {
        Self {
            ipfs_hash: ipfs_hash.to_string(),
            has_meta: false,
            runs: 0,
            is_cancelled: false,
        }
    }
}

/// Logical identity of one workflow execution. Two `Run` events carrying the
/// same key are the same execution observed twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    pub ipfs_hash: String,
    pub nonce: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = flowdexing_run_markers)]
pub struct UnsavedRunMarker {
    pub ipfs_hash: String,
    pub nonce: String,
}

impl From<&RunKey> for UnsavedRunMarker {
    fn from(key: &RunKey) -> Self {
        Self {
            ipfs_hash: key.ipfs_hash.clone(),
            nonce: key.nonce.clone(),
        }
    }
}
