use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

/// One governed action inside a multisig request, serialized exactly as the
/// deployed multisig contract expects it: tagged by `"type"`, with amounts
/// and gas as decimal strings on the wire.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MultisigAction {
    CreateAccount,
    DeployContract {
        /// Base64-encoded contract code.
        code: String,
    },
    AddMember {
        member: MultisigMember,
    },
    DeleteMember {
        member: MultisigMember,
    },
    AddKey {
        public_key: String,
    },
    DeleteKey {
        public_key: String,
    },
    SetNumConfirmations {
        num_confirmations: u32,
    },
    SetActiveRequestsLimit {
        active_requests_limit: u32,
    },
    Transfer {
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
    },
    NearEscrowTransfer {
        receiver_id: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
        label: String,
        is_cancellable: bool,
    },
    #[serde(rename = "FTEscrowTransfer")]
    FtEscrowTransfer {
        receiver_id: String,
        #[serde_as(as = "DisplayFromStr")]
        amount: u128,
        token_id: String,
        label: String,
        is_cancellable: bool,
    },
    FunctionCall {
        method_name: String,
        /// Base64 of the method's JSON arguments.
        args: String,
        #[serde_as(as = "DisplayFromStr")]
        deposit: u128,
        #[serde_as(as = "DisplayFromStr")]
        gas: u64,
    },
}

impl MultisigAction {
    /// Decodes a `FunctionCall`'s base64 argument payload back into JSON.
    /// `None` for other variants and for payloads that are not base64 JSON.
    pub fn decoded_args(&self) -> Option<Value> {
        match self {
            MultisigAction::FunctionCall { args, .. } => {
                let bytes = BASE64.decode(args).ok()?;
                serde_json::from_slice(&bytes).ok()
            }
            _ => None,
        }
    }
}

/// A multisig member as the contract stores it: either a named account or a
/// bare access key. The wire format carries no tag, the field name decides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MultisigMember {
    AccountId { account_id: String },
    PublicKey { public_key: String },
}

impl MultisigMember {
    /// The member's identity for display: its account id or its public key.
    pub fn display_id(&self) -> &str {
        match self {
            MultisigMember::AccountId { account_id } => account_id,
            MultisigMember::PublicKey { public_key } => public_key,
        }
    }
}
