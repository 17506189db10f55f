use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::action::MultisigAction;

/// One TGas. Every gas literal in this crate is a named constant scaled by
/// this unit; the network enforces hard per-transaction ceilings and an
/// underbudgeted action fails late and expensively on chain.
pub const TGAS: u64 = 1_000_000_000_000;

/// Hard per-transaction gas ceiling enforced by the network.
pub const MAX_GAS_PER_TRANSACTION: u64 = 300 * TGAS;

/// Gas attached to a governed inner action by default.
pub const DEFAULT_ACTION_GAS: u64 = 50 * TGAS;

/// Outer margin covering `add_request` bookkeeping on the multisig
/// contract, on top of the worst-case inner action cost.
pub const ADD_REQUEST_OVERHEAD_GAS: u64 = 50 * TGAS;

/// Gas for direct multisig maintenance calls (confirm / delete).
pub const MAINTENANCE_GAS: u64 = 25 * TGAS;

/// One whole native token in yocto.
pub const ONE_NEAR: u128 = 1_000_000_000_000_000_000_000_000;
pub const ONE_MILLINEAR: u128 = ONE_NEAR / 1_000;
/// The 1-yocto deposit fungible token transfers require as a proof of a
/// full-access signature.
pub const ONE_YOCTO: u128 = 1;

/// Violations caught locally, before anything is sent to the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("gas budget {requested} exceeds the per-transaction ceiling of {ceiling}")]
    GasAboveCeiling { requested: u64, ceiling: u64 },

    #[error("required minimum-output parameter `{0}` is missing or zero")]
    MissingMinimum(&'static str),

    #[error("amount `{text}` carries more fraction digits than the token's {decimals} decimals")]
    AmountPrecision { text: String, decimals: u32 },

    #[error("malformed amount `{0}`")]
    MalformedAmount(String),

    #[error("amount `{0}` overflows the 128-bit indivisible range")]
    AmountOverflow(String),

    #[error("vesting schedule and salt do not match the on-chain schedule hash")]
    VestingHashMismatch,

    #[error("failed to serialize arguments: {0}")]
    Serialize(String),
}

/// The outer transaction handed to a signer. Every transaction this core
/// produces is a single function call, so the shape is fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignableTransaction {
    pub signer_id: String,
    pub receiver_id: String,
    pub method_name: String,
    pub args: serde_json::Value,
    pub deposit: u128,
    pub gas: u64,
}

/// Builds a governed `FunctionCall` action: serializes `args` to canonical
/// JSON and base64-encodes them the way the multisig contract stores them.
///
/// A gas budget above the network ceiling is reported, never clamped.
pub fn function_call_action<A: Serialize>(
    method_name: &str,
    args: &A,
    deposit: u128,
    gas: u64,
) -> Result<MultisigAction, PreconditionError> {
    if gas > MAX_GAS_PER_TRANSACTION {
        return Err(PreconditionError::GasAboveCeiling {
            requested: gas,
            ceiling: MAX_GAS_PER_TRANSACTION,
        });
    }
    let json =
        serde_json::to_vec(args).map_err(|e| PreconditionError::Serialize(e.to_string()))?;
    Ok(MultisigAction::FunctionCall {
        method_name: method_name.to_owned(),
        args: BASE64.encode(json),
        deposit,
        gas,
    })
}

fn inner_gas(action: &MultisigAction) -> u64 {
    match action {
        MultisigAction::FunctionCall { gas, .. } => *gas,
        _ => 0,
    }
}

/// Wraps inner actions as one `add_request` call on the multisig contract.
///
/// Exactly one request is created per call. Flows needing several governed
/// steps call this once per step and submit the results separately, because
/// the governing contract executes at most one request per invocation.
pub fn wrap_as_multisig_request(
    multisig_account: &str,
    target_account: &str,
    actions: Vec<MultisigAction>,
) -> Result<SignableTransaction, PreconditionError> {
    let gas = actions.iter().map(inner_gas).sum::<u64>() + ADD_REQUEST_OVERHEAD_GAS;
    if gas > MAX_GAS_PER_TRANSACTION {
        return Err(PreconditionError::GasAboveCeiling {
            requested: gas,
            ceiling: MAX_GAS_PER_TRANSACTION,
        });
    }
    Ok(SignableTransaction {
        signer_id: multisig_account.to_owned(),
        receiver_id: multisig_account.to_owned(),
        method_name: "add_request".to_owned(),
        args: json!({
            "request": {
                "receiver_id": target_account,
                "actions": actions,
            }
        }),
        deposit: 0,
        gas,
    })
}

/// Direct (non-governed) confirmation of a pending request by a member.
pub fn confirm_request_transaction(multisig_account: &str, request_id: u32) -> SignableTransaction {
    maintenance_call(multisig_account, "confirm", request_id)
}

/// Direct deletion of a pending request by a member.
pub fn delete_request_transaction(multisig_account: &str, request_id: u32) -> SignableTransaction {
    maintenance_call(multisig_account, "delete_request", request_id)
}

fn maintenance_call(multisig_account: &str, method: &str, request_id: u32) -> SignableTransaction {
    SignableTransaction {
        signer_id: multisig_account.to_owned(),
        receiver_id: multisig_account.to_owned(),
        method_name: method.to_owned(),
        args: json!({ "request_id": request_id }),
        deposit: 0,
        gas: MAINTENANCE_GAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_gas_above_ceiling() {
        let err = function_call_action("ping", &json!({}), 0, 301 * TGAS).unwrap_err();
        assert_eq!(
            err,
            PreconditionError::GasAboveCeiling {
                requested: 301 * TGAS,
                ceiling: MAX_GAS_PER_TRANSACTION,
            }
        );
    }

    #[test]
    fn function_call_encodes_args_as_base64_json() {
        let action =
            function_call_action("ping", &json!({"a": 1}), ONE_YOCTO, DEFAULT_ACTION_GAS).unwrap();
        match &action {
            MultisigAction::FunctionCall {
                method_name,
                deposit,
                gas,
                ..
            } => {
                assert_eq!(method_name, "ping");
                assert_eq!(*deposit, ONE_YOCTO);
                assert_eq!(*gas, DEFAULT_ACTION_GAS);
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(action.decoded_args().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn wraps_actions_as_add_request() {
        let action = function_call_action("ping", &json!({}), 0, DEFAULT_ACTION_GAS).unwrap();
        let tx = wrap_as_multisig_request("dao.near", "target.near", vec![action]).unwrap();

        assert_eq!(tx.signer_id, "dao.near");
        assert_eq!(tx.receiver_id, "dao.near");
        assert_eq!(tx.method_name, "add_request");
        assert_eq!(tx.deposit, 0);
        assert_eq!(tx.gas, DEFAULT_ACTION_GAS + ADD_REQUEST_OVERHEAD_GAS);
        assert_eq!(tx.args["request"]["receiver_id"], "target.near");
        assert_eq!(tx.args["request"]["actions"][0]["type"], "FunctionCall");
    }

    #[test]
    fn outer_gas_respects_ceiling() {
        let actions: Vec<_> = (0..6)
            .map(|_| function_call_action("ping", &json!({}), 0, DEFAULT_ACTION_GAS).unwrap())
            .collect();
        let err = wrap_as_multisig_request("dao.near", "target.near", actions).unwrap_err();
        assert!(matches!(err, PreconditionError::GasAboveCeiling { .. }));
    }

    #[test]
    fn non_function_call_actions_cost_no_inner_gas() {
        let tx = wrap_as_multisig_request(
            "dao.near",
            "target.near",
            vec![MultisigAction::Transfer { amount: ONE_NEAR }],
        )
        .unwrap();
        assert_eq!(tx.gas, ADD_REQUEST_OVERHEAD_GAS);
    }

    #[test]
    fn maintenance_calls_have_fixed_budget() {
        let confirm = confirm_request_transaction("dao.near", 7);
        assert_eq!(confirm.method_name, "confirm");
        assert_eq!(confirm.args, json!({"request_id": 7}));
        assert_eq!(confirm.gas, MAINTENANCE_GAS);

        let delete = delete_request_transaction("dao.near", 7);
        assert_eq!(delete.method_name, "delete_request");
        assert_eq!(delete.receiver_id, "dao.near");
    }
}
