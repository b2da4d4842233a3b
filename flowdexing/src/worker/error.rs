use derive_more::Display;
use ethers::providers::ProviderError;

use crate::processor::ParseError;
use crate::repos::RepoError;

/// Why one poll cycle made no progress. All variants leave the persisted
/// chain state exactly as the previous successful commit left it; the worker
/// retries the same range on its next tick.
#[derive(Debug, Display)]
pub enum CycleError {
    #[display("transient fetch error: {_0}")]
    TransientFetch(String),
    #[display("{_0}")]
    Parse(ParseError),
    #[display("commit failed: {_0}")]
    Commit(RepoError),
}

impl From<ProviderError> for CycleError {
    fn from(error: ProviderError) -> Self {
        CycleError::TransientFetch(error.to_string())
    }
}

impl From<ParseError> for CycleError {
    fn from(error: ParseError) -> Self {
        CycleError::Parse(error)
    }
}

impl From<RepoError> for CycleError {
    fn from(error: RepoError) -> Self {
        CycleError::Commit(error)
    }
}
