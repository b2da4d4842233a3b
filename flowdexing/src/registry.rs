use std::collections::HashMap;

use ethers::abi::{Event, HumanReadableParser, LogParam};
use ethers::types::{Address, Filter as EthersFilter, Log, H256};

use crate::chains::Chain;
use crate::config::ConfigError;

const CREATED_ABI: &str = "event Created(string ipfsHash)";
const RUN_ABI: &str = "event Run(string ipfsHash, uint256 jobId, uint256 nonce)";
const CANCELLED_ABI: &str = "event Cancelled(string ipfsHash)";

/// The registry contract events the indexer cares about. Any other log
/// emitted by the contract is ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Run,
    Cancelled,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "Created",
            EventKind::Run => "Run",
            EventKind::Cancelled => "Cancelled",
        }
    }
}

/// Parsed ABI of the registry's event surface, built once per worker.
#[derive(Clone, Debug)]
pub struct RegistryEvents {
    events: HashMap<EventKind, Event>,
    kinds_by_topic: HashMap<H256, EventKind>,
}

impl Default for RegistryEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryEvents {
    pub fn new() -> Self {
        let events: HashMap<_, _> = [
            (EventKind::Created, CREATED_ABI),
            (EventKind::Run, RUN_ABI),
            (EventKind::Cancelled, CANCELLED_ABI),
        ]
        .into_iter()
        .map(|(kind, abi)| (kind, HumanReadableParser::parse_event(abi).unwrap()))
        .collect();

        let kinds_by_topic =
            events.iter().map(|(kind, event)| (event.signature(), *kind)).collect();

        Self {
            events,
            kinds_by_topic,
        }
    }

    pub fn kind_of(&self, topic0: &H256) -> Option<EventKind> {
        self.kinds_by_topic.get(topic0).copied()
    }

    pub fn topic_of(&self, kind: EventKind) -> H256 {
        self.events[&kind].signature()
    }

    pub fn topics(&self) -> Vec<H256> {
        [EventKind::Created, EventKind::Run, EventKind::Cancelled]
            .into_iter()
            .map(|kind| self.topic_of(kind))
            .collect()
    }

    pub fn parse(
        &self,
        kind: EventKind,
        log: &Log,
    ) -> Result<Vec<LogParam>, ethers::abi::Error> {
        Ok(self.events[&kind].parse_log(log.clone().into())?.params)
    }
}

/// Address/topic filter for one chain's registry contract, prebuilt from
/// validated configuration.
#[derive(Clone, Debug)]
pub struct RegistryFilter {
    address: Address,
    topics: Vec<H256>,
}

impl RegistryFilter {
    pub fn new(chain: &Chain, registry: &RegistryEvents) -> Result<Self, ConfigError> {
        let address = chain
            .registry_address
            .parse::<Address>()
            .map_err(|_| ConfigError::InvalidRegistryAddress(chain.id))?;

        Ok(Self {
            address,
            topics: registry.topics(),
        })
    }

    /// Filter for an inclusive block range.
    pub fn between(&self, from_block: u64, to_block: u64) -> EthersFilter {
        EthersFilter::new()
            .address(self.address)
            .topic0(self.topics.clone())
            .from_block(from_block)
            .to_block(to_block)
    }
}
