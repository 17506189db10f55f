use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::request::SignableTransaction;

/// Read-only access to chain state, injected into every component that
/// needs it. Nothing in this crate reaches for a network handle through
/// globals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Raw contract state bytes of `account_id`, as stored under the
    /// contract's state key.
    async fn query_state(&self, account_id: &str) -> Result<Vec<u8>, QueryError>;

    /// Read-only contract call returning the method's JSON result.
    async fn query_view(
        &self,
        account_id: &str,
        method: &str,
        args: Value,
    ) -> Result<Value, QueryError>;
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("contract returned an error: {0}")]
    Contract(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Broadcast capability for signed transactions. `submit` waits for
/// finality; a returned `Ok` means the transaction's effects are final on
/// chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmitTransaction: Send + Sync {
    async fn submit(
        &self,
        transaction: &SignableTransaction,
    ) -> Result<ExecutionOutcome, SubmitError>;
}

/// Final outcome of a submitted transaction.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub transaction_hash: String,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Transient failure before the transaction reached the chain. The same
    /// step may be retried by the caller.
    #[error("transient network failure: {0}")]
    Network(String),

    /// The chain executed the transaction and it failed.
    #[error("transaction rejected on-chain: {0}")]
    Rejected(String),

    /// The transaction was broadcast but finality was never observed. The
    /// step may or may not have taken effect; retrying risks a double
    /// submit.
    #[error("transaction broadcast, outcome unknown")]
    OutcomeUnknown,
}
