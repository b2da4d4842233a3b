mod events;
mod metadata;
mod providers;

pub use events::*;
pub use metadata::*;
pub use providers::*;

use flowdexing::Chain;

pub const REGISTRY_ADDRESS: &str = "0x1f9840a85d5af5bf1d1762f925bdaddc4201f984";
pub const WORKFLOW_HASH: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
pub const OTHER_WORKFLOW_HASH: &str = "QmPZ9gcCEpqKTo6aq61g2nXGUhM4iCL3ewB6LDXZCtioEB";

pub fn test_chain(id: u64) -> Chain {
    Chain::new(id, "https://rpc.example.com", REGISTRY_ADDRESS)
        .with_start_block_number(100)
        .with_batch_size(50)
        .with_block_delay(2)
        .with_sync_threshold(100)
}
