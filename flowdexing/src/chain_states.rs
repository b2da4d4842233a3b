use diesel::{Insertable, Queryable};
use serde::Deserialize;

use crate::chains::Chain;
use crate::diesel::schema::flowdexing_chain_states;

/// Persisted scan progress and liveness status for one chain.
/// `last_processed_block` is the single source of truth for the next fetch
/// range and only ever advances together with a committed batch.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq, Queryable)]
#[diesel(table_name = flowdexing_chain_states)]
pub struct ChainState {
    pub chain_id: i64,
    pub last_processed_block: i64,
    pub is_synced: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = flowdexing_chain_states)]
pub struct UnsavedChainState {
    pub chain_id: i64,
    pub last_processed_block: i64,
    pub is_synced: bool,
}

impl UnsavedChainState {
    pub fn new(chain: &Chain) -> Self {
        Self {
            chain_id: chain.id as i64,
            last_processed_block: chain.start_block_number as i64,
            is_synced: false,
        }
    }
}
