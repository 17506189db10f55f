use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::action::{MultisigAction, MultisigMember};
use crate::chain::{ChainQuery, QueryError};

/// A queued batch of actions awaiting confirmation, as returned by the
/// multisig contract's `get_request` view. Confirmation bookkeeping is
/// contract state, not carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigRequest {
    pub receiver_id: String,
    pub actions: Vec<MultisigAction>,
}

/// A request joined with its contract-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: u32,
    pub request: MultisigRequest,
}

/// Typed wrapper over the multisig contract's view surface.
pub struct MultisigViewClient<Q> {
    chain: Q,
    account_id: String,
}

impl<Q: ChainQuery> MultisigViewClient<Q> {
    pub fn new(chain: Q, account_id: impl Into<String>) -> Self {
        Self {
            chain,
            account_id: account_id.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub async fn list_request_ids(&self) -> Result<Vec<u32>, QueryError> {
        self.view("list_request_ids", json!({})).await
    }

    pub async fn get_request(&self, request_id: u32) -> Result<MultisigRequest, QueryError> {
        self.view("get_request", json!({ "request_id": request_id }))
            .await
    }

    /// All pending requests, ids joined with their bodies. Bodies are
    /// fetched concurrently; the result follows the contract's id order.
    pub async fn pending_requests(&self) -> Result<Vec<PendingRequest>, QueryError> {
        let ids = self.list_request_ids().await?;
        let bodies = join_all(ids.iter().map(|id| self.get_request(*id))).await;
        ids.into_iter()
            .zip(bodies)
            .map(|(id, body)| {
                Ok(PendingRequest {
                    id,
                    request: body?,
                })
            })
            .collect()
    }

    pub async fn get_members(&self) -> Result<Vec<MultisigMember>, QueryError> {
        self.view("get_members", json!({})).await
    }

    pub async fn get_num_confirmations(&self) -> Result<u32, QueryError> {
        self.view("get_num_confirmations", json!({})).await
    }

    /// Keys that have confirmed `request_id` so far.
    pub async fn get_confirmations(&self, request_id: u32) -> Result<Vec<String>, QueryError> {
        self.view("get_confirmations", json!({ "request_id": request_id }))
            .await
    }

    async fn view<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<T, QueryError> {
        let value = self.chain.query_view(&self.account_id, method, args).await?;
        serde_json::from_value(value).map_err(|e| QueryError::Malformed(e.to_string()))
    }
}
