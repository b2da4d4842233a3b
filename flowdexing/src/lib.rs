//! Indexes workflow registry events from any number of EVM chains into one
//! Postgres store. Each chain gets a polling worker that commits events,
//! workflow deltas and its scan position atomically; a backfill task fills
//! in workflow metadata from a content-addressed gateway.

pub mod backfill;
mod chain_states;
mod chains;
mod config;
mod diesel;
mod events;
mod node_task;
pub mod processor;
mod registry;
mod repos;
pub mod sync_status;
pub mod worker;
mod workflows;

pub use backfill::{BackfillReport, FetchError, HttpMetadataFetcher, MetadataFetcher};
pub use chain_states::{ChainState, UnsavedChainState};
pub use chains::Chain;
pub use config::{Config, ConfigError};
pub use events::{RunReceipt, WorkflowEvent};
pub use node_task::NodeTask;
pub use processor::{ParseError, ProcessedBatch};
pub use registry::{EventKind, RegistryEvents, RegistryFilter};
pub use repos::*;
pub use worker::{CycleError, CycleOutcome, Provider};
pub use workflows::{RunKey, UnsavedWorkflow, Workflow};

use std::fmt::Debug;

pub type FlowdexingRepo = PostgresRepo;
pub type FlowdexingRepoPool = PostgresRepoPool;
pub type FlowdexingRepoConn<'a> = PostgresRepoConn<'a>;

pub enum FlowdexingError {
    Config(ConfigError),
    Repo(RepoError),
}

impl From<ConfigError> for FlowdexingError {
    fn from(value: ConfigError) -> Self {
        FlowdexingError::Config(value)
    }
}

impl From<RepoError> for FlowdexingError {
    fn from(value: RepoError) -> Self {
        FlowdexingError::Repo(value)
    }
}

impl Debug for FlowdexingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlowdexingError::Config(config_error) => {
                write!(f, "Config Error: {config_error}")
            }
            FlowdexingError::Repo(repo_error) => {
                write!(f, "Repo Error: {repo_error}")
            }
        }
    }
}

/// Boots the indexer: validates the configuration, runs migrations, seeds
/// chain states and spawns the per-chain workers plus the metadata backfill
/// task. The returned handle stops all of them.
pub async fn index_workflows(config: &Config) -> Result<NodeTask, FlowdexingError> {
    config.validate()?;

    let Config { repo, .. } = config;
    repo.migrate().await?;
    if config.fresh_start {
        repo.reset().await?;
    }

    let pool = repo.get_pool(1).await;
    let mut conn = FlowdexingRepo::get_conn(&pool).await;
    let chain_states: Vec<UnsavedChainState> =
        config.chains.iter().map(UnsavedChainState::new).collect();
    FlowdexingRepo::create_chain_states(&mut conn, &chain_states).await?;

    let mut tasks = worker::start(config);
    tasks.push(backfill::start(config));

    Ok(NodeTask::new(tasks))
}
