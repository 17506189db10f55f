use anyhow::{Context, Result};
use near_treasury_lib::chain::ChainQuery;
use near_treasury_lib::config::NetworkConfig;
use near_treasury_lib::lockup::{
    decode_lockup_state, format_timestamp_ns, format_vesting_schedule, release_duration_days,
    StakingPoolIdEncoding, TransferInformation, VestingInformation,
};
use near_treasury_lib::token::{format_near_amount, NATIVE_TOKEN_SYMBOL};

use crate::rpc::JsonRpcChainQuery;

pub async fn run(config: &NetworkConfig, account: &str, pool_id_format: &str) -> Result<()> {
    let encoding = match pool_id_format {
        "u128" => StakingPoolIdEncoding::U128,
        "utf8" => StakingPoolIdEncoding::Utf8,
        other => anyhow::bail!("Unknown pool id format: {} (expected u128 or utf8)", other),
    };

    let chain = JsonRpcChainQuery::new(&config.rpc_url);
    let bytes = chain.query_state(account).await?;
    let state = decode_lockup_state(&bytes, encoding)
        .with_context(|| format!("Failed to decode lockup state of {account}"))?;

    println!("Lockup {account}");
    println!("  Owner: {}", state.owner_account_id);
    println!(
        "  Locked amount: {}{NATIVE_TOKEN_SYMBOL}",
        format_near_amount(state.lockup_amount)
    );
    if state.termination_withdrawn_tokens > 0 {
        println!(
            "  Withdrawn after termination: {}{NATIVE_TOKEN_SYMBOL}",
            format_near_amount(state.termination_withdrawn_tokens)
        );
    }
    if let Some(duration) = state.release_duration {
        println!("  Release duration: {} day(s)", release_duration_days(duration));
    }

    match &state.transfer_information {
        TransferInformation::DisabledUntil {
            transfers_timestamp,
        } => println!(
            "  Transfers: disabled until {}",
            format_timestamp_ns(*transfers_timestamp)
        ),
        TransferInformation::EnabledViaPoll {
            transfer_poll_account_id,
        } => println!("  Transfers: enabled via poll {transfer_poll_account_id}"),
    }

    match &state.vesting_information {
        VestingInformation::Hash(hash) => {
            println!("  Vesting: private schedule, hash {}", hex::encode(hash))
        }
        VestingInformation::Schedule(schedule) => {
            println!("  Vesting: {}", format_vesting_schedule(schedule))
        }
        VestingInformation::Terminating {
            unvested_amount,
            status,
        } => println!(
            "  Vesting: terminating, {}{NATIVE_TOKEN_SYMBOL} unvested (status {status})",
            format_near_amount(*unvested_amount)
        ),
        VestingInformation::Unknown(tag) => {
            println!("  Vesting: information unavailable (unrecognized record {tag})")
        }
    }

    if let Some(whitelist) = &state.staking_pool_whitelist_account_id {
        println!("  Pool whitelist: {whitelist}");
    }
    if let Some(staking) = &state.staking_information {
        println!(
            "  Staking pool: {} ({}), deposit {}{NATIVE_TOKEN_SYMBOL}",
            staking.staking_pool_account_id,
            staking.status,
            format_near_amount(staking.deposit_amount)
        );
    }
    if let Some(foundation) = &state.foundation_account_id {
        println!("  Foundation: {foundation}");
    }

    Ok(())
}
