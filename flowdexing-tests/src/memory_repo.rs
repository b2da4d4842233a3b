//! In-memory `Repo` with the same commit contract as the Postgres one:
//! `commit_batch` applies everything or nothing, run markers are unique per
//! `(ipfs_hash, nonce)` across the whole store, and log records are unique
//! per `(chain_id, transaction_hash, event)`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use flowdexing::{
    ChainState, CommitSummary, ProcessedBatch, Repo, RepoError, UnsavedChainState, Workflow,
    WorkflowEvent,
};

#[derive(Clone, Debug, Default)]
struct Data {
    chain_states: HashMap<i64, ChainState>,
    events: Vec<WorkflowEvent>,
    workflows: HashMap<String, Workflow>,
    run_markers: HashSet<(String, String)>,
}

#[derive(Clone, Default)]
pub struct MemoryRepo {
    data: Arc<Mutex<Data>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `commit_batch` fail before applying anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Repo for MemoryRepo {
    type Pool = MemoryRepo;
    type Conn<'a> = MemoryRepo;

    async fn get_pool(&self, _max_size: u32) -> Self::Pool {
        self.clone()
    }

    async fn get_conn<'a>(pool: &'a Self::Pool) -> Self::Conn<'a> {
        pool.clone()
    }

    async fn create_chain_states<'a>(
        conn: &mut Self::Conn<'a>,
        chain_states: &[UnsavedChainState],
    ) -> Result<(), RepoError> {
        let mut data = conn.data.lock().unwrap();

        for chain_state in chain_states {
            data.chain_states.entry(chain_state.chain_id).or_insert(ChainState {
                chain_id: chain_state.chain_id,
                last_processed_block: chain_state.last_processed_block,
                is_synced: chain_state.is_synced,
            });
        }

        Ok(())
    }

    async fn get_chain_state<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
    ) -> Result<Option<ChainState>, RepoError> {
        Ok(conn.data.lock().unwrap().chain_states.get(&chain_id).cloned())
    }

    async fn update_sync_status<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        is_synced: bool,
    ) -> Result<(), RepoError> {
        let mut data = conn.data.lock().unwrap();
        let chain_state = data
            .chain_states
            .get_mut(&chain_id)
            .ok_or_else(|| RepoError::Unknown(format!("unknown chain {chain_id}")))?;
        chain_state.is_synced = is_synced;

        Ok(())
    }

    async fn commit_batch<'a>(
        conn: &mut Self::Conn<'a>,
        chain_id: i64,
        batch: &ProcessedBatch,
        last_processed_block: i64,
    ) -> Result<CommitSummary, RepoError> {
        if conn.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(RepoError::Unknown("injected commit failure".to_string()));
        }

        let mut data = conn.data.lock().unwrap();
        // Staging a full copy keeps the all-or-nothing contract even if a
        // later step bails out.
        let mut staged = data.clone();

        let mut inserted_events = 0;
        for event in &batch.events {
            let duplicate = staged.events.iter().any(|existing| {
                existing.chain_id == event.chain_id
                    && existing.transaction_hash == event.transaction_hash
                    && existing.event == event.event
            });
            if !duplicate {
                staged.events.push(event.clone());
                inserted_events += 1;
            }
        }

        for ipfs_hash in &batch.new_workflows {
            staged.workflows.entry(ipfs_hash.clone()).or_insert(Workflow {
                ipfs_hash: ipfs_hash.clone(),
                has_meta: false,
                runs: 0,
                is_cancelled: false,
                meta: None,
                last_meta_fetch_failure: None,
            });
        }

        let mut new_runs = 0;
        for run in &batch.runs {
            if staged.run_markers.insert((run.ipfs_hash.clone(), run.nonce.clone())) {
                let workflow = staged
                    .workflows
                    .get_mut(&run.ipfs_hash)
                    .ok_or_else(|| RepoError::Unknown(format!("unknown workflow {}", run.ipfs_hash)))?;
                workflow.runs += 1;
                if workflow.execution_count().is_some_and(|count| workflow.runs >= count) {
                    workflow.is_cancelled = true;
                }
                new_runs += 1;
            }
        }

        for ipfs_hash in &batch.cancellations {
            if let Some(workflow) = staged.workflows.get_mut(ipfs_hash) {
                workflow.is_cancelled = true;
            }
        }

        let chain_state = staged
            .chain_states
            .get_mut(&chain_id)
            .ok_or_else(|| RepoError::Unknown(format!("unknown chain {chain_id}")))?;
        chain_state.last_processed_block = last_processed_block;

        let summary = CommitSummary {
            events: inserted_events,
            new_runs,
        };
        *data = staged;

        Ok(summary)
    }

    async fn get_due_backfills<'a>(
        conn: &mut Self::Conn<'a>,
        cutoff: i64,
        limit: i64,
    ) -> Result<Vec<Workflow>, RepoError> {
        let data = conn.data.lock().unwrap();

        let mut due: Vec<Workflow> =
            data.workflows.values().filter(|workflow| workflow.backfill_due(cutoff)).cloned().collect();
        due.sort_by(|a, b| a.ipfs_hash.cmp(&b.ipfs_hash));
        due.truncate(limit as usize);

        Ok(due)
    }

    async fn fill_meta<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        meta: &serde_json::Value,
    ) -> Result<(), RepoError> {
        let mut data = conn.data.lock().unwrap();

        if let Some(workflow) = data.workflows.get_mut(ipfs_hash) {
            workflow.has_meta = true;
            workflow.meta = Some(meta.clone());
            workflow.last_meta_fetch_failure = None;
        }

        Ok(())
    }

    async fn record_meta_failure<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
        failed_at: i64,
    ) -> Result<(), RepoError> {
        let mut data = conn.data.lock().unwrap();

        if let Some(workflow) = data.workflows.get_mut(ipfs_hash) {
            workflow.last_meta_fetch_failure = Some(failed_at);
        }

        Ok(())
    }

    async fn get_all_events<'a>(
        conn: &mut Self::Conn<'a>,
    ) -> Result<Vec<WorkflowEvent>, RepoError> {
        let mut events = conn.data.lock().unwrap().events.clone();
        events.sort_by_key(|event| (event.chain_id, event.block_number));

        Ok(events)
    }

    async fn get_workflow<'a>(
        conn: &mut Self::Conn<'a>,
        ipfs_hash: &str,
    ) -> Result<Option<Workflow>, RepoError> {
        Ok(conn.data.lock().unwrap().workflows.get(ipfs_hash).cloned())
    }
}
