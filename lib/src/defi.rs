//! Multi-step DeFi flow builders: each returns the ordered sequence of
//! governed requests for the [`Sequencer`](crate::sequencer::Sequencer) to
//! run. Precondition violations are caught here, before any network call.

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::chain::{ChainQuery, QueryError};
use crate::config::NetworkConfig;
use crate::request::{
    function_call_action, wrap_as_multisig_request, PreconditionError, DEFAULT_ACTION_GAS,
    ONE_MILLINEAR, ONE_YOCTO, TGAS,
};
use crate::sequencer::SequenceStep;
use crate::token::{ft_metadata, parse_token_amount};

/// Storage deposits the counterparty contracts expect when registering a
/// fresh account.
pub const EXCHANGE_STORAGE_DEPOSIT: u128 = 125 * ONE_MILLINEAR;
pub const EXCHANGE_WITHDRAW_STORAGE_DEPOSIT: u128 = 5 * ONE_MILLINEAR;
pub const LENDING_STORAGE_DEPOSIT: u128 = 250 * ONE_MILLINEAR;
/// Deposit covering pool bookkeeping when adding liquidity.
pub const ADD_LIQUIDITY_DEPOSIT: u128 = 10 * ONE_MILLINEAR;

/// Stable pools settle N-legged deposits and need a bigger inner budget.
pub const STABLE_LIQUIDITY_GAS: u64 = 100 * TGAS;
/// Post-withdrawal token payouts cascade through the exchange's internal
/// ledger.
pub const EXCHANGE_WITHDRAW_GAS: u64 = 200 * TGAS;

#[derive(Debug, Error)]
pub enum DefiError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Registers `funding` with `contract` so the contract will track its
/// balance. Idempotent: the contract no-ops when the account is already
/// registered, so this step is safe to attempt unconditionally.
fn storage_deposit_step(
    funding: &str,
    contract: &str,
    deposit: u128,
) -> Result<SequenceStep, PreconditionError> {
    let action = function_call_action(
        "storage_deposit",
        &json!({
            "account_id": funding,
            "registration_only": false,
        }),
        deposit,
        DEFAULT_ACTION_GAS,
    )?;
    Ok(SequenceStep {
        label: format!("register {funding} with {contract}"),
        transaction: wrap_as_multisig_request(funding, contract, vec![action])?,
    })
}

/// Moves custody of `amount` of `token_id` to `receiver` and triggers its
/// transfer callback with `msg`.
fn ft_transfer_call_step(
    funding: &str,
    token_id: &str,
    receiver: &str,
    amount: u128,
    msg: &str,
) -> Result<SequenceStep, PreconditionError> {
    let action = function_call_action(
        "ft_transfer_call",
        &json!({
            "receiver_id": receiver,
            "amount": amount.to_string(),
            "msg": msg,
        }),
        ONE_YOCTO,
        DEFAULT_ACTION_GAS,
    )?;
    Ok(SequenceStep {
        label: format!("transfer {token_id} into {receiver}"),
        transaction: wrap_as_multisig_request(funding, token_id, vec![action])?,
    })
}

/// Two-sided deposit into a simple pool.
#[derive(Debug, Clone)]
pub struct PoolDepositParams {
    /// The multisig account funding the operation.
    pub funding_account_id: String,
    pub pool_id: u64,
    pub token_left_account_id: String,
    pub token_left_amount: u128,
    pub token_right_account_id: String,
    pub token_right_amount: u128,
}

/// Steps for a two-leg liquidity deposit: register with the exchange, move
/// each leg into exchange custody, then add liquidity.
pub fn pool_deposit_steps(
    config: &NetworkConfig,
    params: &PoolDepositParams,
) -> Result<Vec<SequenceStep>, PreconditionError> {
    let exchange = &config.accounts.ref_exchange;
    let funding = &params.funding_account_id;

    let add_liquidity = function_call_action(
        "add_liquidity",
        &json!({
            "pool_id": params.pool_id,
            "amounts": [
                params.token_left_amount.to_string(),
                params.token_right_amount.to_string(),
            ],
        }),
        ADD_LIQUIDITY_DEPOSIT,
        DEFAULT_ACTION_GAS,
    )?;

    Ok(vec![
        storage_deposit_step(funding, exchange, EXCHANGE_STORAGE_DEPOSIT)?,
        ft_transfer_call_step(
            funding,
            &params.token_left_account_id,
            exchange,
            params.token_left_amount,
            "",
        )?,
        ft_transfer_call_step(
            funding,
            &params.token_right_account_id,
            exchange,
            params.token_right_amount,
            "",
        )?,
        SequenceStep {
            label: format!("add liquidity to pool {}", params.pool_id),
            transaction: wrap_as_multisig_request(funding, exchange, vec![add_liquidity])?,
        },
    ])
}

/// N-legged deposit into a stable pool.
#[derive(Debug, Clone)]
pub struct StablePoolDepositParams {
    pub funding_account_id: String,
    pub pool_id: u64,
    /// Token account id and amount per leg; zero-amount legs are skipped.
    pub legs: Vec<(String, u128)>,
    /// Minimum pool shares to mint, taken verbatim from the caller. Never
    /// defaulted: a missing minimum would submit an unbounded-slippage
    /// action.
    pub min_shares: u128,
}

pub fn stable_pool_deposit_steps(
    config: &NetworkConfig,
    params: &StablePoolDepositParams,
) -> Result<Vec<SequenceStep>, PreconditionError> {
    if params.min_shares == 0 {
        return Err(PreconditionError::MissingMinimum("min_shares"));
    }
    let exchange = &config.accounts.ref_exchange;
    let funding = &params.funding_account_id;

    let mut steps = vec![storage_deposit_step(
        funding,
        exchange,
        EXCHANGE_STORAGE_DEPOSIT,
    )?];
    for (token_id, amount) in &params.legs {
        if *amount == 0 {
            continue;
        }
        steps.push(ft_transfer_call_step(funding, token_id, exchange, *amount, "")?);
    }

    let amounts: Vec<String> = params
        .legs
        .iter()
        .map(|(_, amount)| amount.to_string())
        .collect();
    let add_stable_liquidity = function_call_action(
        "add_stable_liquidity",
        &json!({
            "pool_id": params.pool_id,
            "amounts": amounts,
            "min_shares": params.min_shares.to_string(),
        }),
        ADD_LIQUIDITY_DEPOSIT,
        STABLE_LIQUIDITY_GAS,
    )?;
    steps.push(SequenceStep {
        label: format!("add stable liquidity to pool {}", params.pool_id),
        transaction: wrap_as_multisig_request(funding, exchange, vec![add_stable_liquidity])?,
    });
    Ok(steps)
}

/// Withdrawal of pool shares back into the funding account's tokens.
#[derive(Debug, Clone)]
pub struct PoolWithdrawalParams {
    pub funding_account_id: String,
    pub pool_id: u64,
    /// Pool shares to burn.
    pub shares: u128,
    /// The pool's token account ids, in pool order.
    pub tokens: Vec<String>,
    /// Minimum amount out per token, taken verbatim from the caller.
    pub min_amounts: Vec<u128>,
}

pub fn pool_withdrawal_steps(
    config: &NetworkConfig,
    params: &PoolWithdrawalParams,
) -> Result<Vec<SequenceStep>, PreconditionError> {
    if params.min_amounts.len() != params.tokens.len()
        || params.min_amounts.iter().any(|min| *min == 0)
    {
        return Err(PreconditionError::MissingMinimum("min_amounts"));
    }
    let exchange = &config.accounts.ref_exchange;
    let funding = &params.funding_account_id;

    let min_amounts: Vec<String> = params
        .min_amounts
        .iter()
        .map(|amount| amount.to_string())
        .collect();
    let remove_liquidity = function_call_action(
        "remove_liquidity",
        &json!({
            "pool_id": params.pool_id,
            "shares": params.shares.to_string(),
            "min_amounts": min_amounts,
        }),
        ONE_YOCTO,
        DEFAULT_ACTION_GAS,
    )?;

    let mut steps = vec![
        storage_deposit_step(funding, exchange, EXCHANGE_WITHDRAW_STORAGE_DEPOSIT)?,
        SequenceStep {
            label: format!("remove liquidity from pool {}", params.pool_id),
            transaction: wrap_as_multisig_request(funding, exchange, vec![remove_liquidity])?,
        },
    ];
    for token_id in &params.tokens {
        // Amount "0" asks the exchange to pay out the full internal balance.
        let withdraw = function_call_action(
            "withdraw",
            &json!({
                "token_id": token_id,
                "amount": "0",
                "unregister": false,
            }),
            ONE_YOCTO,
            EXCHANGE_WITHDRAW_GAS,
        )?;
        steps.push(SequenceStep {
            label: format!("withdraw {token_id} from the exchange"),
            transaction: wrap_as_multisig_request(funding, exchange, vec![withdraw])?,
        });
    }
    Ok(steps)
}

/// Slice of the lending contract's asset record this crate needs.
#[derive(Debug, Clone, Deserialize)]
pub struct LendingAsset {
    pub config: LendingAssetConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LendingAssetConfig {
    /// Extra precision the lending contract tracks on top of the token's
    /// own decimals.
    pub extra_decimals: u32,
}

async fn lending_asset(
    chain: &impl ChainQuery,
    lending_contract: &str,
    token_id: &str,
) -> Result<LendingAsset, QueryError> {
    let value = chain
        .query_view(lending_contract, "get_asset", json!({ "token_id": token_id }))
        .await?;
    serde_json::from_value(value).map_err(|e| QueryError::Malformed(e.to_string()))
}

/// Supply of a token as lending collateral.
#[derive(Debug, Clone)]
pub struct CollateralSupplyParams {
    pub funding_account_id: String,
    pub token_account_id: String,
    /// Human decimal amount, converted through the integer indivisible path
    /// against the token's live decimals.
    pub amount: String,
}

/// Steps supplying a token as collateral to the lending contract: register,
/// then transfer custody with an `IncreaseCollateral` execution message.
///
/// The token's decimals and the lending contract's extra precision are
/// fetched concurrently before any amount is fixed; neither is ever
/// hard-coded.
pub async fn collateral_supply_steps(
    config: &NetworkConfig,
    chain: &impl ChainQuery,
    params: &CollateralSupplyParams,
) -> Result<Vec<SequenceStep>, DefiError> {
    let lending_contract = &config.accounts.burrow;
    let funding = &params.funding_account_id;

    let (metadata, asset) = futures::try_join!(
        ft_metadata(chain, &params.token_account_id),
        lending_asset(chain, lending_contract, &params.token_account_id),
    )?;

    let amount = parse_token_amount(&params.amount, metadata.decimals)?;
    let scale = 10u128
        .checked_pow(asset.config.extra_decimals)
        .ok_or_else(|| PreconditionError::AmountOverflow(params.amount.clone()))?;
    let max_amount = amount
        .checked_mul(scale)
        .ok_or_else(|| PreconditionError::AmountOverflow(params.amount.clone()))?;
    let msg = json!({
        "Execute": {
            "actions": [
                {
                    "IncreaseCollateral": {
                        "token_id": params.token_account_id,
                        "max_amount": max_amount.to_string(),
                    }
                }
            ]
        }
    })
    .to_string();

    Ok(vec![
        storage_deposit_step(funding, lending_contract, LENDING_STORAGE_DEPOSIT)?,
        ft_transfer_call_step(
            funding,
            &params.token_account_id,
            lending_contract,
            amount,
            &msg,
        )?,
    ])
}

/// Display-only suggestion for the opposite leg of a two-sided deposit,
/// derived from the pool's float price ratio. Never submit this value: a
/// submitted amount must go back through [`parse_token_amount`] against the
/// counter token's live decimals.
pub fn suggest_counter_amount(amount: u128, decimals: u32, price_ratio: f64) -> f64 {
    let human = amount as f64 / 10f64.powi(decimals as i32);
    human * price_ratio
}
