//! Advisory liveness status: a chain counts as synced while its block lag
//! stays strictly below the configured threshold. Workers keep polling
//! regardless of the outcome.

pub fn is_synced(current_head: u64, last_processed_block: i64, sync_threshold: u64) -> bool {
    let last_processed_block = last_processed_block.max(0) as u64;

    current_head.saturating_sub(last_processed_block) < sync_threshold
}
