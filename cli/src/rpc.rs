use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use near_treasury_lib::chain::{ChainQuery, QueryError};
use serde_json::{json, Value};
use tracing::debug;

/// [`ChainQuery`] over NEAR JSON-RPC. Read-only: this client never signs or
/// submits anything.
pub struct JsonRpcChainQuery {
    http: reqwest::Client,
    rpc_url: String,
}

impl JsonRpcChainQuery {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
        }
    }

    async fn query(&self, params: Value) -> Result<Value, QueryError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": "near-treasury",
            "method": "query",
            "params": params,
        });
        debug!(url = %self.rpc_url, "rpc query");
        let response: Value = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?
            .json()
            .await
            .map_err(|e| QueryError::Malformed(e.to_string()))?;

        if let Some(error) = response.get("error") {
            return Err(QueryError::Contract(error.to_string()));
        }
        response
            .get("result")
            .cloned()
            .ok_or_else(|| QueryError::Malformed("response has no result".to_owned()))
    }
}

#[async_trait]
impl ChainQuery for JsonRpcChainQuery {
    async fn query_state(&self, account_id: &str) -> Result<Vec<u8>, QueryError> {
        let result = self
            .query(json!({
                "request_type": "view_state",
                "finality": "final",
                "account_id": account_id,
                "prefix_base64": "",
            }))
            .await?;

        // Singleton contract state lives under the STATE key.
        let state_key = BASE64.encode("STATE");
        let values = result
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| QueryError::Malformed("view_state has no values".to_owned()))?;
        for entry in values {
            if entry.get("key").and_then(Value::as_str) == Some(state_key.as_str()) {
                let value = entry
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or_else(|| QueryError::Malformed("state entry has no value".to_owned()))?;
                return BASE64
                    .decode(value)
                    .map_err(|e| QueryError::Malformed(e.to_string()));
            }
        }
        Err(QueryError::Contract(format!(
            "{account_id} has no contract state"
        )))
    }

    async fn query_view(
        &self,
        account_id: &str,
        method: &str,
        args: Value,
    ) -> Result<Value, QueryError> {
        let result = self
            .query(json!({
                "request_type": "call_function",
                "finality": "final",
                "account_id": account_id,
                "method_name": method,
                "args_base64": BASE64.encode(args.to_string()),
            }))
            .await?;

        let bytes = result
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| QueryError::Malformed("call_function has no result".to_owned()))?
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| QueryError::Malformed("non-byte in result".to_owned()))?;
        serde_json::from_slice(&bytes).map_err(|e| QueryError::Malformed(e.to_string()))
    }
}
