//! Interprets pending multisig actions as structured human explanations.
//!
//! The engine is a pure dispatch over the action variants plus a closed
//! catalogue of known function-call methods. It never errors: unknown
//! methods, malformed arguments, and failed metadata lookups all degrade to
//! a generic deposit/gas description instead of fabricating semantics.

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};
use tracing::debug;

use crate::action::MultisigAction;
use crate::chain::ChainQuery;
use crate::multisig::MultisigRequest;
use crate::token::{format_near_amount, format_token_amount, ft_metadata, NATIVE_TOKEN_SYMBOL};

/// Human rendering of one governed action. Derived data: recomputed on each
/// request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub full_description: String,
    pub short_description: String,
}

impl Explanation {
    fn uniform(description: String) -> Self {
        Self {
            full_description: description.clone(),
            short_description: description,
        }
    }
}

/// Function-call methods this crate knows how to explain: the lockup
/// contract surface plus fungible token transfers. Anything else is
/// rendered generically from deposit and gas alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownMethod {
    AddFullAccessKey,
    Transfer,
    Unstake,
    UnstakeAll,
    DepositAndStake,
    WithdrawFromStakingPool,
    WithdrawAllFromStakingPool,
    SelectStakingPool,
    UnselectStakingPool,
    RefreshStakingPoolBalance,
    CheckTransfersVote,
    FtTransfer,
    FtTransferCall,
}

impl KnownMethod {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "add_full_access_key" => Self::AddFullAccessKey,
            "transfer" => Self::Transfer,
            "unstake" => Self::Unstake,
            "unstake_all" => Self::UnstakeAll,
            "deposit_and_stake" => Self::DepositAndStake,
            "withdraw_from_staking_pool" => Self::WithdrawFromStakingPool,
            "withdraw_all_from_staking_pool" => Self::WithdrawAllFromStakingPool,
            "select_staking_pool" => Self::SelectStakingPool,
            "unselect_staking_pool" => Self::UnselectStakingPool,
            "refresh_staking_pool_balance" => Self::RefreshStakingPoolBalance,
            "check_transfers_vote" => Self::CheckTransfersVote,
            "ft_transfer" => Self::FtTransfer,
            "ft_transfer_call" => Self::FtTransferCall,
            _ => return None,
        })
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct TransferArgs {
    receiver_id: String,
    #[serde_as(as = "DisplayFromStr")]
    amount: u128,
}

#[derive(Debug, Deserialize)]
struct AddFullAccessKeyArgs {
    new_public_key: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct StakeAmountArgs {
    #[serde_as(as = "DisplayFromStr")]
    amount: u128,
}

#[derive(Debug, Deserialize)]
struct SelectStakingPoolArgs {
    staking_pool_account_id: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct FtTransferArgs {
    receiver_id: String,
    #[serde_as(as = "DisplayFromStr")]
    amount: u128,
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FtTransferCallArgs {
    receiver_id: String,
    /// Rendered verbatim; the receiving token's precision is unknown here.
    amount: String,
    memo: Option<String>,
    msg: String,
}

fn parse<T: DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

/// Interprets pending multisig actions for display. Holds the read-only
/// chain-query capability used to fetch token metadata for amount
/// rendering.
pub struct Explainer<Q> {
    chain: Q,
}

impl<Q: ChainQuery> Explainer<Q> {
    pub fn new(chain: Q) -> Self {
        Self { chain }
    }

    /// Explains `action`, pending on the multisig contract `from` and
    /// addressed to `to`. Always produces output.
    pub async fn explain(&self, action: &MultisigAction, to: &str, from: &str) -> Explanation {
        match action {
            MultisigAction::CreateAccount => Explanation {
                full_description: "Creates a new account on behalf of the multisig contract."
                    .to_owned(),
                short_description: "Create Account".to_owned(),
            },
            MultisigAction::DeployContract { .. } => Explanation {
                full_description: format!("Deploys a contract to {from} with the provided code."),
                short_description: "Deploy Contract".to_owned(),
            },
            MultisigAction::AddMember { member } => Explanation {
                full_description: format!(
                    "Adds a new member with the public key: {} to {from} multisig contract.",
                    member.display_id()
                ),
                short_description: "Add Member".to_owned(),
            },
            MultisigAction::DeleteMember { member } => Explanation {
                full_description: format!(
                    "Removes a member with the public key: {} from {from}.",
                    member.display_id()
                ),
                short_description: "Delete Member".to_owned(),
            },
            MultisigAction::AddKey { public_key } => Explanation {
                full_description: format!(
                    "Adds a new key with the public key: {public_key} to {from} multisig contract."
                ),
                short_description: "Add Key".to_owned(),
            },
            MultisigAction::DeleteKey { public_key } => Explanation {
                full_description: format!(
                    "Deletes a key with the public key: {public_key} from {from} multisig contract."
                ),
                short_description: "Delete Key".to_owned(),
            },
            MultisigAction::SetNumConfirmations { num_confirmations } => Explanation {
                full_description: format!(
                    "Sets the number of confirmations required for a multisig request to: \
                     {num_confirmations}."
                ),
                short_description: "Set Confirmations".to_owned(),
            },
            MultisigAction::SetActiveRequestsLimit {
                active_requests_limit,
            } => Explanation {
                full_description: format!(
                    "Sets the limit for active (unconfirmed) requests to: {active_requests_limit}."
                ),
                short_description: "Set Request Limit".to_owned(),
            },
            MultisigAction::Transfer { amount } => {
                let amount = format_near_amount(*amount);
                Explanation {
                    full_description: format!(
                        "Transfers {amount}{NATIVE_TOKEN_SYMBOL} from {from} to {to}."
                    ),
                    short_description: format!(
                        "Transfer {amount}{NATIVE_TOKEN_SYMBOL} to {to}"
                    ),
                }
            }
            MultisigAction::NearEscrowTransfer {
                receiver_id,
                amount,
                label,
                is_cancellable,
            } => {
                let amount = format_near_amount(*amount);
                let negation = if *is_cancellable { "" } else { "not " };
                Explanation {
                    full_description: format!(
                        "Transfers {amount}{NATIVE_TOKEN_SYMBOL} from {from} to the receiver: \
                         {receiver_id} with the label: {label}. Transaction is \
                         {negation}cancellable."
                    ),
                    short_description: format!(
                        "Escrow Transfer {amount}{NATIVE_TOKEN_SYMBOL} to {receiver_id}"
                    ),
                }
            }
            MultisigAction::FtEscrowTransfer {
                receiver_id,
                amount,
                token_id,
                label,
                is_cancellable,
            } => {
                let amount = format_near_amount(*amount);
                let negation = if *is_cancellable { "" } else { "not " };
                Explanation {
                    full_description: format!(
                        "Transfers {amount}{NATIVE_TOKEN_SYMBOL} of the token: {token_id} from \
                         {from} to the receiver: {receiver_id} with the label: {label}. \
                         Transaction is {negation}cancellable."
                    ),
                    short_description: format!(
                        "FT Escrow Transfer {amount}{NATIVE_TOKEN_SYMBOL} to {receiver_id}"
                    ),
                }
            }
            MultisigAction::FunctionCall {
                method_name,
                deposit,
                gas,
                ..
            } => {
                self.explain_function_call(method_name, action.decoded_args(), *deposit, *gas, to)
                    .await
            }
        }
    }

    /// Explains every action of a pending request. Per-action metadata
    /// lookups run concurrently; the output order always follows the action
    /// order, not fetch completion.
    pub async fn explain_request(
        &self,
        request: &MultisigRequest,
        multisig_account: &str,
    ) -> Vec<Explanation> {
        join_all(
            request
                .actions
                .iter()
                .map(|action| self.explain(action, &request.receiver_id, multisig_account)),
        )
        .await
    }

    async fn explain_function_call(
        &self,
        method_name: &str,
        args: Option<Value>,
        deposit: u128,
        gas: u64,
        to: &str,
    ) -> Explanation {
        let generic = format!(
            "The deposit for this function call is: {}{NATIVE_TOKEN_SYMBOL} and the gas limit \
             is: {} TGas.",
            format_near_amount(deposit),
            format_token_amount(gas as u128, 12),
        );
        let Some(method) = KnownMethod::from_name(method_name) else {
            debug!(method = method_name, "no explainer for method, rendering generically");
            return Explanation::uniform(generic);
        };
        match self.method_explanation(method, args, to).await {
            Some(detail) => Explanation::uniform(format!("{detail} {generic}")),
            None => {
                debug!(method = method_name, "explainer degraded to generic description");
                Explanation::uniform(generic)
            }
        }
    }

    /// Per-method explanation with schema-typed arguments. `None` on any
    /// failure (missing args, schema mismatch, metadata lookup error); the
    /// caller falls back to the generic description.
    async fn method_explanation(
        &self,
        method: KnownMethod,
        args: Option<Value>,
        to: &str,
    ) -> Option<String> {
        let args = args?;
        Some(match method {
            KnownMethod::AddFullAccessKey => {
                let args: AddFullAccessKeyArgs = parse(args)?;
                format!("Adds a new full access key: {}.", args.new_public_key)
            }
            KnownMethod::Transfer => {
                let args: TransferArgs = parse(args)?;
                format!(
                    "Transfers {}{NATIVE_TOKEN_SYMBOL} from {to} to {}.",
                    format_near_amount(args.amount),
                    args.receiver_id
                )
            }
            KnownMethod::Unstake => {
                let args: StakeAmountArgs = parse(args)?;
                format!(
                    "Unstakes {}{NATIVE_TOKEN_SYMBOL}.",
                    format_near_amount(args.amount)
                )
            }
            KnownMethod::UnstakeAll => "Unstakes all tokens.".to_owned(),
            KnownMethod::DepositAndStake => {
                let args: StakeAmountArgs = parse(args)?;
                format!(
                    "Deposits and stakes {}{NATIVE_TOKEN_SYMBOL}.",
                    format_near_amount(args.amount)
                )
            }
            KnownMethod::WithdrawFromStakingPool => {
                let args: StakeAmountArgs = parse(args)?;
                format!(
                    "Withdraws {}{NATIVE_TOKEN_SYMBOL} from the staking pool.",
                    format_near_amount(args.amount)
                )
            }
            KnownMethod::WithdrawAllFromStakingPool => {
                "Withdraws all funds from the selected staking pool.".to_owned()
            }
            KnownMethod::SelectStakingPool => {
                let args: SelectStakingPoolArgs = parse(args)?;
                format!(
                    "Selects staking pool with account ID: {}.",
                    args.staking_pool_account_id
                )
            }
            KnownMethod::UnselectStakingPool => {
                "Unselects the currently selected staking pool.".to_owned()
            }
            KnownMethod::RefreshStakingPoolBalance => {
                "Refreshes the balance of the selected staking pool.".to_owned()
            }
            KnownMethod::CheckTransfersVote => "Checks the vote on transfers. If the voting \
                contract returns \"yes\", transfers will be enabled. If the vote is \"no\", \
                transfers will remain disabled."
                .to_owned(),
            KnownMethod::FtTransfer => {
                let args: FtTransferArgs = parse(args)?;
                // The destination account is the token contract; its
                // metadata decides how the raw amount reads.
                let metadata = ft_metadata(&self.chain, to).await.ok()?;
                format!(
                    "Transfers {} {} to {}. Memo: {}.",
                    format_token_amount(args.amount, metadata.decimals),
                    metadata.symbol,
                    args.receiver_id,
                    args.memo.as_deref().unwrap_or("None")
                )
            }
            KnownMethod::FtTransferCall => {
                let args: FtTransferCallArgs = parse(args)?;
                format!(
                    "Transfers {} tokens from {to} to {}, and makes a contract call. Memo: {}, \
                     Message: {}",
                    args.amount,
                    args.receiver_id,
                    args.memo.as_deref().unwrap_or("None"),
                    args.msg
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::MultisigMember;
    use crate::chain::{MockChainQuery, QueryError};
    use crate::request::{ONE_NEAR, TGAS};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use serde_json::json;

    fn explainer() -> Explainer<MockChainQuery> {
        // No expectations: any chain call in these tests is a bug.
        Explainer::new(MockChainQuery::new())
    }

    fn function_call(method: &str, args: Value, deposit: u128, gas: u64) -> MultisigAction {
        MultisigAction::FunctionCall {
            method_name: method.to_owned(),
            args: BASE64.encode(args.to_string()),
            deposit,
            gas,
        }
    }

    #[tokio::test]
    async fn transfer_renders_whole_native_units() {
        let action = MultisigAction::Transfer { amount: ONE_NEAR };
        let explanation = explainer().explain(&action, "bob.near", "alice.near").await;
        assert_eq!(explanation.short_description, "Transfer 1Ⓝ to bob.near");
        assert_eq!(
            explanation.full_description,
            "Transfers 1Ⓝ from alice.near to bob.near."
        );
    }

    #[tokio::test]
    async fn unknown_method_gets_generic_description_only() {
        let action = function_call("mystery_method", json!({"x": 1}), ONE_NEAR, 50 * TGAS);
        let explanation = explainer().explain(&action, "bob.near", "alice.near").await;
        assert_eq!(
            explanation.full_description,
            "The deposit for this function call is: 1Ⓝ and the gas limit is: 50 TGas."
        );
        assert_eq!(explanation.short_description, explanation.full_description);
    }

    #[tokio::test]
    async fn known_method_prefixes_the_generic_description() {
        let action = function_call(
            "transfer",
            json!({"receiver_id": "carol.near", "amount": ONE_NEAR.to_string()}),
            0,
            250 * TGAS,
        );
        let explanation = explainer()
            .explain(&action, "lockup-1.lockup.near", "dao.near")
            .await;
        assert_eq!(
            explanation.full_description,
            "Transfers 1Ⓝ from lockup-1.lockup.near to carol.near. The deposit for this \
             function call is: 0Ⓝ and the gas limit is: 250 TGas."
        );
    }

    #[tokio::test]
    async fn malformed_args_degrade_to_generic() {
        let action = MultisigAction::FunctionCall {
            method_name: "transfer".to_owned(),
            args: "!!! not base64".to_owned(),
            deposit: 0,
            gas: 50 * TGAS,
        };
        let explanation = explainer().explain(&action, "bob.near", "alice.near").await;
        assert_eq!(
            explanation.full_description,
            "The deposit for this function call is: 0Ⓝ and the gas limit is: 50 TGas."
        );

        // Well-formed base64 JSON that misses the schema degrades the same
        // way.
        let action = function_call("transfer", json!({"nonsense": true}), 0, 50 * TGAS);
        let explanation = explainer().explain(&action, "bob.near", "alice.near").await;
        assert_eq!(
            explanation.full_description,
            "The deposit for this function call is: 0Ⓝ and the gas limit is: 50 TGas."
        );
    }

    #[tokio::test]
    async fn ft_transfer_renders_live_decimals_and_symbol() {
        let mut chain = MockChainQuery::new();
        chain.expect_query_view().returning(|account, method, _| {
            assert_eq!(account, "usdt.near");
            assert_eq!(method, "ft_metadata");
            Ok(json!({
                "spec": "ft-1.0.0",
                "name": "Tether",
                "symbol": "USDT",
                "decimals": 6,
            }))
        });

        let action = function_call(
            "ft_transfer",
            json!({"receiver_id": "bob.near", "amount": "1500000"}),
            1,
            50 * TGAS,
        );
        let explanation = Explainer::new(chain)
            .explain(&action, "usdt.near", "dao.near")
            .await;
        assert!(explanation
            .full_description
            .starts_with("Transfers 1.5 USDT to bob.near. Memo: None."));
    }

    #[tokio::test]
    async fn hostile_token_decimals_degrade_to_generic() {
        let mut chain = MockChainQuery::new();
        chain.expect_query_view().returning(|_, _, _| {
            Ok(json!({
                "spec": "ft-1.0.0",
                "name": "Hostile",
                "symbol": "EVIL",
                "decimals": 40,
            }))
        });

        let action = function_call(
            "ft_transfer",
            json!({"receiver_id": "bob.near", "amount": "1"}),
            0,
            50 * TGAS,
        );
        let explanation = Explainer::new(chain)
            .explain(&action, "evil.near", "dao.near")
            .await;
        assert_eq!(
            explanation.full_description,
            "The deposit for this function call is: 0Ⓝ and the gas limit is: 50 TGas."
        );
    }

    #[tokio::test]
    async fn metadata_failure_degrades_to_generic() {
        let mut chain = MockChainQuery::new();
        chain
            .expect_query_view()
            .returning(|_, _, _| Err(QueryError::Network("timeout".to_owned())));

        let action = function_call(
            "ft_transfer",
            json!({"receiver_id": "bob.near", "amount": "1500000"}),
            0,
            50 * TGAS,
        );
        let explanation = Explainer::new(chain)
            .explain(&action, "usdt.near", "dao.near")
            .await;
        assert_eq!(
            explanation.full_description,
            "The deposit for this function call is: 0Ⓝ and the gas limit is: 50 TGas."
        );
    }

    #[tokio::test]
    async fn member_and_key_actions_describe_the_contract() {
        let action = MultisigAction::AddMember {
            member: MultisigMember::PublicKey {
                public_key: "ed25519:abc".to_owned(),
            },
        };
        let explanation = explainer().explain(&action, "dao.near", "dao.near").await;
        assert_eq!(
            explanation.full_description,
            "Adds a new member with the public key: ed25519:abc to dao.near multisig contract."
        );
        assert_eq!(explanation.short_description, "Add Member");

        let action = MultisigAction::SetNumConfirmations {
            num_confirmations: 3,
        };
        let explanation = explainer().explain(&action, "dao.near", "dao.near").await;
        assert_eq!(
            explanation.full_description,
            "Sets the number of confirmations required for a multisig request to: 3."
        );
    }

    #[tokio::test]
    async fn escrow_transfer_spells_out_cancellability() {
        let action = MultisigAction::NearEscrowTransfer {
            receiver_id: "bob.near".to_owned(),
            amount: ONE_NEAR,
            label: "grant".to_owned(),
            is_cancellable: false,
        };
        let explanation = explainer().explain(&action, "escrow.near", "dao.near").await;
        assert_eq!(
            explanation.full_description,
            "Transfers 1Ⓝ from dao.near to the receiver: bob.near with the label: grant. \
             Transaction is not cancellable."
        );
        assert_eq!(
            explanation.short_description,
            "Escrow Transfer 1Ⓝ to bob.near"
        );
    }

    #[tokio::test]
    async fn request_explanations_follow_action_order() {
        let request = MultisigRequest {
            receiver_id: "dao.near".to_owned(),
            actions: vec![
                MultisigAction::SetNumConfirmations {
                    num_confirmations: 2,
                },
                MultisigAction::Transfer { amount: ONE_NEAR },
            ],
        };
        let explanations = explainer().explain_request(&request, "dao.near").await;
        assert_eq!(explanations.len(), 2);
        assert_eq!(explanations[0].short_description, "Set Confirmations");
        assert_eq!(
            explanations[1].short_description,
            "Transfer 1Ⓝ to dao.near"
        );
    }
}
