use std::str::FromStr;

use ethers::abi::{encode, Token};
use ethers::types::{Bytes, Log, H160, H256, U256};
use flowdexing::{EventKind, RegistryEvents};

use super::REGISTRY_ADDRESS;

pub fn created_log(registry: &RegistryEvents, ipfs_hash: &str, block_number: u64) -> Log {
    registry_log(
        registry,
        EventKind::Created,
        encode(&[Token::String(ipfs_hash.to_string())]),
        block_number,
    )
}

pub fn run_log(
    registry: &RegistryEvents,
    ipfs_hash: &str,
    job_id: u64,
    nonce: u64,
    block_number: u64,
) -> Log {
    registry_log(
        registry,
        EventKind::Run,
        encode(&[
            Token::String(ipfs_hash.to_string()),
            Token::Uint(U256::from(job_id)),
            Token::Uint(U256::from(nonce)),
        ]),
        block_number,
    )
}

pub fn cancelled_log(registry: &RegistryEvents, ipfs_hash: &str, block_number: u64) -> Log {
    registry_log(
        registry,
        EventKind::Cancelled,
        encode(&[Token::String(ipfs_hash.to_string())]),
        block_number,
    )
}

pub fn transaction_hash(block_number: u64) -> H256 {
    H256::from_low_u64_be(block_number)
}

fn registry_log(
    registry: &RegistryEvents,
    kind: EventKind,
    data: Vec<u8>,
    block_number: u64,
) -> Log {
    Log {
        address: H160::from_str(REGISTRY_ADDRESS).unwrap(),
        topics: vec![registry.topic_of(kind)],
        data: Bytes::from(data),
        block_hash: None,
        block_number: Some(block_number.into()),
        transaction_hash: Some(transaction_hash(block_number)),
        transaction_index: Some(0.into()),
        log_index: Some(0.into()),
        transaction_log_index: None,
        log_type: None,
        removed: Some(false),
    }
}
