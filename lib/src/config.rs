/// Read-only network configuration, injected at construction and never
/// mutated at runtime.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub network_id: String,
    pub rpc_url: String,
    pub accounts: WellKnownAccounts,
}

/// Contract accounts the treasury flows talk to.
#[derive(Debug, Clone)]
pub struct WellKnownAccounts {
    pub multisig_factory: String,
    pub lockup_factory: String,
    pub foundation: String,
    pub ref_exchange: String,
    pub burrow: String,
}

impl NetworkConfig {
    pub fn mainnet() -> Self {
        Self {
            network_id: "mainnet".to_owned(),
            rpc_url: "https://rpc.mainnet.near.org".to_owned(),
            accounts: WellKnownAccounts {
                multisig_factory: "multisignature.near".to_owned(),
                lockup_factory: "lockup.near".to_owned(),
                foundation: "foundation.near".to_owned(),
                ref_exchange: "v2.ref-finance.near".to_owned(),
                burrow: "contract.main.burrow.near".to_owned(),
            },
        }
    }

    pub fn testnet() -> Self {
        Self {
            network_id: "testnet".to_owned(),
            rpc_url: "https://rpc.testnet.near.org".to_owned(),
            accounts: WellKnownAccounts {
                multisig_factory: "multisignature.testnet".to_owned(),
                lockup_factory: "lockup.testnet".to_owned(),
                foundation: "foundation.testnet".to_owned(),
                ref_exchange: "ref-finance-101.testnet".to_owned(),
                burrow: "contract.1638481328.burrow.testnet".to_owned(),
            },
        }
    }
}
