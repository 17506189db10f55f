use anyhow::Result;
use near_treasury_lib::config::NetworkConfig;
use near_treasury_lib::multisig::MultisigViewClient;

use crate::rpc::JsonRpcChainQuery;

pub async fn run(config: &NetworkConfig, account: &str) -> Result<()> {
    let client = MultisigViewClient::new(JsonRpcChainQuery::new(&config.rpc_url), account);

    let members = client.get_members().await?;
    let num_confirmations = client.get_num_confirmations().await?;

    println!(
        "{account}: {} member(s), {num_confirmations} confirmation(s) required",
        members.len()
    );
    for member in &members {
        println!("  {}", member.display_id());
    }

    Ok(())
}
