//! Lockup contract support: decoding raw lockup state into typed records
//! and building governed requests for lockup creation and vesting
//! termination.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{serde_as, DisplayFromStr};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::codec::{DecodeError, StateReader, StateWriter};
use crate::config::NetworkConfig;
use crate::request::{
    function_call_action, wrap_as_multisig_request, PreconditionError, SignableTransaction, TGAS,
};

/// Inner gas for lockup contract calls; lockup methods cascade into
/// staking-pool promises and need a large budget.
pub const LOCKUP_CALL_GAS: u64 = 250 * TGAS;

/// Phase 2 launch instant, in nanoseconds. Lockups deployed with a broken
/// timestamp are pinned to this moment by the contract.
pub const PHASE2_TIMESTAMP_NS: u64 = 1_602_614_338_293_769_340;

const NANOS_PER_DAY: u64 = 24 * 60 * 60 * 1_000_000_000;

/// A public vesting schedule: release from `start` to `end`, nothing
/// withdrawable before `cliff`. Timestamps are nanoseconds since epoch,
/// carried as decimal strings on the wire.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    #[serde_as(as = "DisplayFromStr")]
    pub start_timestamp: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub cliff_timestamp: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub end_timestamp: u64,
}

/// Vesting information as stored in lockup contract state.
///
/// Produced only by decoding; the variants mirror the exact on-chain
/// encoding and are never constructed ad hoc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VestingInformation {
    /// Private vesting: only a hash of the schedule is on chain.
    Hash([u8; 32]),
    /// Public vesting schedule.
    Schedule(VestingSchedule),
    /// Vesting terminated by the foundation; the unvested remainder is
    /// being clawed back.
    Terminating { unvested_amount: u128, status: u8 },
    /// A discriminant this decoder does not recognize. Callers render
    /// "vesting information unavailable" instead of losing the whole read.
    Unknown(u8),
}

/// Decodes one vesting record. Unrecognized discriminants are not fatal:
/// they surface as [`VestingInformation::Unknown`], never as an error.
pub fn decode_vesting_information(
    reader: &mut StateReader<'_>,
) -> Result<VestingInformation, DecodeError> {
    let tag = reader.read_u8()?;
    match tag {
        1 => Ok(VestingInformation::Hash(reader.read_fixed()?)),
        2 => Ok(VestingInformation::Schedule(VestingSchedule {
            start_timestamp: reader.read_u64()?,
            cliff_timestamp: reader.read_u64()?,
            end_timestamp: reader.read_u64()?,
        })),
        3 => Ok(VestingInformation::Terminating {
            unvested_amount: reader.read_u128()?,
            status: reader.read_u8()?,
        }),
        other => {
            debug!(tag = other, "unrecognized vesting discriminant");
            Ok(VestingInformation::Unknown(other))
        }
    }
}

/// Re-encodes a vesting record in the on-chain layout. `Unknown` records
/// carry an unreadable payload and cannot be re-encoded.
pub fn encode_vesting_information(info: &VestingInformation) -> Option<Vec<u8>> {
    let mut writer = StateWriter::new();
    match info {
        VestingInformation::Hash(hash) => {
            writer.write_u8(1);
            writer.write_bytes(hash);
        }
        VestingInformation::Schedule(schedule) => {
            writer.write_u8(2);
            writer.write_u64(schedule.start_timestamp);
            writer.write_u64(schedule.cliff_timestamp);
            writer.write_u64(schedule.end_timestamp);
        }
        VestingInformation::Terminating {
            unvested_amount,
            status,
        } => {
            writer.write_u8(3);
            writer.write_u128(*unvested_amount);
            writer.write_u8(*status);
        }
        VestingInformation::Unknown(_) => return None,
    }
    Some(writer.into_bytes())
}

/// How to decode the staking pool account id field of a staking record.
///
/// The observed client reads this field as a u128 although it is
/// conceptually an account id string. The true on-chain layout has not been
/// confirmed against the deployed contract, so both interpretations are
/// kept behind this flag instead of silently fixing either one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StakingPoolIdEncoding {
    #[default]
    U128,
    Utf8,
}

/// A staking pool identity under either decoding of the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StakingPoolId {
    Numeric(u128),
    AccountId(String),
}

impl fmt::Display for StakingPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StakingPoolId::Numeric(value) => write!(f, "{value}"),
            StakingPoolId::AccountId(account_id) => f.write_str(account_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakingInformation {
    pub staking_pool_account_id: StakingPoolId,
    pub status: String,
    pub deposit_amount: u128,
}

/// Decodes the optional staking record. A zero presence tag consumes
/// exactly one byte and yields `None`.
pub fn decode_staking_information(
    reader: &mut StateReader<'_>,
    encoding: StakingPoolIdEncoding,
) -> Result<Option<StakingInformation>, DecodeError> {
    if reader.read_u8()? == 0 {
        return Ok(None);
    }
    let staking_pool_account_id = match encoding {
        StakingPoolIdEncoding::U128 => StakingPoolId::Numeric(reader.read_u128()?),
        StakingPoolIdEncoding::Utf8 => StakingPoolId::AccountId(reader.read_string()?),
    };
    Ok(Some(StakingInformation {
        staking_pool_account_id,
        status: reader.read_string()?,
        deposit_amount: reader.read_u128()?,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferInformation {
    /// Transfers are disabled until the given moment.
    DisabledUntil { transfers_timestamp: u64 },
    /// Transfers are gated on the referendum held by this poll contract.
    EnabledViaPoll { transfer_poll_account_id: String },
}

pub fn decode_transfer_information(
    reader: &mut StateReader<'_>,
) -> Result<TransferInformation, DecodeError> {
    if reader.read_u8()? == 0 {
        Ok(TransferInformation::DisabledUntil {
            transfers_timestamp: reader.read_u64()?,
        })
    } else {
        Ok(TransferInformation::EnabledViaPoll {
            transfer_poll_account_id: reader.read_string()?,
        })
    }
}

/// Decoded lockup contract state. An immutable snapshot: a fresh read
/// produces a fresh record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockupState {
    pub owner_account_id: String,
    pub lockup_amount: u128,
    pub termination_withdrawn_tokens: u128,
    pub lockup_duration: u64,
    pub release_duration: Option<u64>,
    pub lockup_timestamp: Option<u64>,
    pub transfer_information: TransferInformation,
    pub vesting_information: VestingInformation,
    pub staking_pool_whitelist_account_id: Option<String>,
    pub staking_information: Option<StakingInformation>,
    pub foundation_account_id: Option<String>,
}

/// Decodes a full lockup state record.
///
/// An unrecognized vesting discriminant leaves the cursor inside a payload
/// of unknown length, so everything after the vesting record is reported
/// absent rather than failing the whole read.
pub fn decode_lockup_state(
    bytes: &[u8],
    pool_id_encoding: StakingPoolIdEncoding,
) -> Result<LockupState, DecodeError> {
    let mut reader = StateReader::new(bytes);
    let owner_account_id = reader.read_string()?;
    let lockup_amount = reader.read_u128()?;
    let termination_withdrawn_tokens = reader.read_u128()?;
    let lockup_duration = reader.read_u64()?;
    let release_duration = reader.read_option(|r| r.read_u64())?;
    let lockup_timestamp = reader.read_option(|r| r.read_u64())?;
    let transfer_information = decode_transfer_information(&mut reader)?;
    let vesting_information = decode_vesting_information(&mut reader)?;

    if let VestingInformation::Unknown(tag) = vesting_information {
        warn!(tag, "unknown vesting record, trailing lockup fields dropped");
        return Ok(LockupState {
            owner_account_id,
            lockup_amount,
            termination_withdrawn_tokens,
            lockup_duration,
            release_duration,
            lockup_timestamp,
            transfer_information,
            vesting_information,
            staking_pool_whitelist_account_id: None,
            staking_information: None,
            foundation_account_id: None,
        });
    }

    let staking_pool_whitelist_account_id = Some(reader.read_string()?);
    let staking_information = decode_staking_information(&mut reader, pool_id_encoding)?;
    let foundation_account_id = reader.read_option(|r| r.read_string())?;

    Ok(LockupState {
        owner_account_id,
        lockup_amount,
        termination_withdrawn_tokens,
        lockup_duration,
        release_duration,
        lockup_timestamp,
        transfer_information,
        vesting_information,
        staking_pool_whitelist_account_id,
        staking_information,
        foundation_account_id,
    })
}

/// Renders a nanosecond timestamp as a UTC date, falling back to the raw
/// value for timestamps outside chrono's range.
pub fn format_timestamp_ns(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let subsec = (nanos % 1_000_000_000) as u32;
    match DateTime::from_timestamp(secs, subsec) {
        Some(datetime) => datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{nanos}ns"),
    }
}

/// Renders a schedule as "from {start} until {end} with cliff at {cliff}".
pub fn format_vesting_schedule(schedule: &VestingSchedule) -> String {
    format!(
        "from {} until {} with cliff at {}",
        format_timestamp_ns(schedule.start_timestamp),
        format_timestamp_ns(schedule.end_timestamp),
        format_timestamp_ns(schedule.cliff_timestamp),
    )
}

/// Whole days in a release duration given in nanoseconds.
pub fn release_duration_days(release_duration_ns: u64) -> u64 {
    release_duration_ns / NANOS_PER_DAY
}

/// Start of lockup as the contract computes it: the later of phase 2 plus
/// the lockup duration and the explicit lockup timestamp. Lockups deployed
/// with a broken timestamp are pinned to the phase 2 instant.
pub fn start_lockup_timestamp(
    lockup_duration: u64,
    lockup_timestamp: u64,
    has_broken_timestamp: bool,
) -> u64 {
    if has_broken_timestamp {
        return PHASE2_TIMESTAMP_NS;
    }
    PHASE2_TIMESTAMP_NS
        .saturating_add(lockup_duration)
        .max(lockup_timestamp)
}

/// Hash the lockup contract stores for a private schedule: sha256 over the
/// schedule's canonical encoding followed by the length-prefixed salt.
pub fn vesting_schedule_hash(schedule: &VestingSchedule, salt: &[u8]) -> [u8; 32] {
    let mut writer = StateWriter::new();
    writer.write_u64(schedule.start_timestamp);
    writer.write_u64(schedule.cliff_timestamp);
    writer.write_u64(schedule.end_timestamp);
    writer.write_u32(salt.len() as u32);
    writer.write_bytes(salt);

    let digest = Sha256::digest(writer.as_bytes());
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

#[derive(Debug, Clone)]
pub struct CreateLockupParams {
    /// The multisig account funding and governing the new lockup.
    pub multisig_account_id: String,
    /// Owner of the lockup once created.
    pub owner_account_id: String,
    /// Deposit funding the lockup, in yocto.
    pub deposit: u128,
    pub schedule: VestingSchedule,
    /// When false the pool whitelist is pinned to the `system` account,
    /// which no pool is registered with, so staking is impossible.
    pub allow_staking: bool,
}

/// Request asking the lockup factory to create a vested lockup.
pub fn create_lockup_request(
    config: &NetworkConfig,
    params: &CreateLockupParams,
) -> Result<SignableTransaction, PreconditionError> {
    let mut args = json!({
        "owner_account_id": params.owner_account_id,
        "lockup_duration": "0",
        "vesting_schedule": { "VestingSchedule": params.schedule },
    });
    if !params.allow_staking {
        args["whitelist_account_id"] = json!("system");
    }
    let action = function_call_action("create", &args, params.deposit, LOCKUP_CALL_GAS)?;
    wrap_as_multisig_request(
        &params.multisig_account_id,
        &config.accounts.lockup_factory,
        vec![action],
    )
}

/// Request terminating a public vesting schedule.
pub fn terminate_vesting_request(
    multisig_account: &str,
    lockup_account: &str,
) -> Result<SignableTransaction, PreconditionError> {
    let action = function_call_action("terminate_vesting", &json!({}), 0, LOCKUP_CALL_GAS)?;
    wrap_as_multisig_request(multisig_account, lockup_account, vec![action])
}

/// Request terminating a private vesting schedule. The revealed schedule
/// and salt must hash to the on-chain schedule hash; a mismatch is caught
/// here and never reaches the network.
pub fn terminate_private_vesting_request(
    multisig_account: &str,
    lockup_account: &str,
    schedule: &VestingSchedule,
    salt: &[u8],
    on_chain_hash: &[u8; 32],
) -> Result<SignableTransaction, PreconditionError> {
    if vesting_schedule_hash(schedule, salt) != *on_chain_hash {
        return Err(PreconditionError::VestingHashMismatch);
    }
    let args = json!({
        "vesting_schedule_with_salt": {
            "vesting_schedule": schedule,
            "salt": BASE64.encode(salt),
        }
    });
    let action = function_call_action("terminate_vesting", &args, 0, LOCKUP_CALL_GAS)?;
    wrap_as_multisig_request(multisig_account, lockup_account, vec![action])
}

/// Request unstaking and withdrawing everything the terminated lockup still
/// holds in its staking pool, so the clawback can proceed.
pub fn termination_prepare_to_withdraw_request(
    multisig_account: &str,
    lockup_account: &str,
) -> Result<SignableTransaction, PreconditionError> {
    let action =
        function_call_action("termination_prepare_to_withdraw", &json!({}), 0, LOCKUP_CALL_GAS)?;
    wrap_as_multisig_request(multisig_account, lockup_account, vec![action])
}

/// Request withdrawing the clawed-back unvested balance to `receiver_id`.
pub fn termination_withdraw_request(
    multisig_account: &str,
    lockup_account: &str,
    receiver_id: &str,
) -> Result<SignableTransaction, PreconditionError> {
    let action = function_call_action(
        "termination_withdraw",
        &json!({ "receiver_id": receiver_id }),
        0,
        LOCKUP_CALL_GAS,
    )?;
    wrap_as_multisig_request(multisig_account, lockup_account, vec![action])
}
