use derive_more::Display;

use crate::chain_states::{ChainState, UnsavedChainState};
use crate::events::WorkflowEvent;
use crate::processor::ProcessedBatch;
use crate::workflows::Workflow;

#[derive(Debug, Display)]
pub enum RepoError {
    NotConnected,
    Unknown(String),
}

/// What a committed batch actually changed, for cycle reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Log records actually inserted after identity dedup.
    pub events: usize,
    /// Run increments applied after dedup against the run-marker index.
    pub new_runs: usize,
}

/// The state store capability the indexer runs against: per-collection
/// upserts, reads by key, and one atomic multi-document commit
/// (`commit_batch`). Implementations must guarantee that a failed commit
/// leaves no partial writes visible.
#[async_trait::async_trait]
pub trait Repo: Sync + Send + Clone {
    type Pool: Send + Sync;
    type Conn<'a>: Send;

    async fn get_pool(&self, max_size: u32) -> Self::Pool;
    async fn get_conn<'a>(pool: &'a Self::Pool) -> Self::Conn<'a>;

    /// Seeds chain states, leaving already-known chains untouched.
    async fn create_chain_states<'a>(
        conn: &mut Self::Conn<'a>,
        chain_states: &[UnsavedChainState],
    ) -> Result<(), RepoError>;
    async fn get_chain_state<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
    ) -> Result<Option<ChainState>, RepoError>;
    async fn update_sync_status<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        is_synced: bool,
    ) -> Result<(), RepoError>;

    /// Applies one processed batch and the new `last_processed_block` as a
    /// single atomic unit. A `(ipfs_hash, nonce)` pair that was already
    /// marked by an earlier commit (from any chain) does not increment
    /// `runs` again; its log record is still inserted, unless a record with
    /// the same `(chain_id, transaction_hash, event)` identity already
    /// exists. A run increment that reaches the workflow's declared
    /// execution count (`meta.workflow.count`) sets `is_cancelled`.
    async fn commit_batch<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        batch: &ProcessedBatch,
        last_processed_block: i64,
    ) -> Result<CommitSummary, RepoError>;

    /// Workflows awaiting metadata whose last fetch failure (if any) is
    /// older than `cutoff`.
    async fn get_due_backfills<'a>(
        conn: &mut Self::Conn<'a>,
        cutoff: i64,
        limit: i64,
    ) -> Result<Vec<Workflow>, RepoError>;
    async fn fill_meta<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        meta: &serde_json::Value,
    ) -> Result<(), RepoError>;
    async fn record_meta_failure<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        failed_at: i64,
    ) -> Result<(), RepoError>;

    async fn get_all_events<'a>(conn: &mut Self::Conn<'a>) -> Result<Vec<WorkflowEvent>, RepoError>;
    async fn get_workflow<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
    ) -> Result<Option<Workflow>, RepoError>;
}

pub trait RepoMigrations {
    fn create_chain_states_migration() -> &'static [&'static str];
    fn create_events_migration() -> &'static [&'static str];
    fn create_workflows_migration() -> &'static [&'static str];
    fn create_run_markers_migration() -> &'static [&'static str];

    fn get_internal_migrations() -> Vec<&'static str> {
        [
            Self::create_chain_states_migration(),
            Self::create_events_migration(),
            Self::create_workflows_migration(),
            Self::create_run_markers_migration(),
        ]
        .concat()
    }
}

pub struct SQLikeMigrations;

impl SQLikeMigrations {
    pub fn create_chain_states() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS flowdexing_chain_states (
                chain_id BIGINT PRIMARY KEY,
                last_processed_block BIGINT NOT NULL,
                is_synced BOOLEAN NOT NULL DEFAULT false
        )"]
    }

    pub fn create_events() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS flowdexing_events (
                id uuid PRIMARY KEY,
                event VARCHAR NOT NULL,
                chain_id BIGINT NOT NULL,
                block_number BIGINT NOT NULL,
                transaction_hash VARCHAR NOT NULL,
                ipfs_hash VARCHAR NOT NULL,
                job_id VARCHAR,
                nonce VARCHAR,
                timestamp BIGINT NOT NULL,
                receipt JSONB,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS flowdexing_events_identity_index
            ON flowdexing_events(chain_id, transaction_hash, event)",
            "CREATE INDEX IF NOT EXISTS flowdexing_events_chain_block_index
            ON flowdexing_events(chain_id, block_number)",
            "CREATE INDEX IF NOT EXISTS flowdexing_events_ipfs_hash_index
            ON flowdexing_events(ipfs_hash)",
        ]
    }

    pub fn create_workflows() -> &'static [&'static str] {
        &["CREATE TABLE IF NOT EXISTS flowdexing_workflows (
                ipfs_hash VARCHAR PRIMARY KEY,
                has_meta BOOLEAN NOT NULL DEFAULT false,
                runs BIGINT NOT NULL DEFAULT 0,
                is_cancelled BOOLEAN NOT NULL DEFAULT false,
                meta JSONB,
                last_meta_fetch_failure BIGINT
        )"]
    }

    pub fn create_run_markers() -> &'static [&'static str] {
        &[
            "CREATE TABLE IF NOT EXISTS flowdexing_run_markers (
                id SERIAL PRIMARY KEY,
                ipfs_hash VARCHAR NOT NULL,
                nonce VARCHAR NOT NULL
            )",
            "CREATE UNIQUE INDEX IF NOT EXISTS flowdexing_run_markers_hash_nonce_index
            ON flowdexing_run_markers(ipfs_hash, nonce)",
        ]
    }

    /// Fresh-start wipe. Schema stays; indexed state goes.
    pub fn wipe() -> &'static [&'static str] {
        &[
            "DELETE FROM flowdexing_run_markers",
            "DELETE FROM flowdexing_events",
            "DELETE FROM flowdexing_workflows",
            "DELETE FROM flowdexing_chain_states",
        ]
    }
}
