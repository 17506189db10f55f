use anyhow::Result;
use near_treasury_lib::config::NetworkConfig;
use near_treasury_lib::explain::Explainer;
use near_treasury_lib::multisig::MultisigViewClient;

use crate::rpc::JsonRpcChainQuery;

pub async fn run(config: &NetworkConfig, account: &str) -> Result<()> {
    let client = MultisigViewClient::new(JsonRpcChainQuery::new(&config.rpc_url), account);
    let explainer = Explainer::new(JsonRpcChainQuery::new(&config.rpc_url));

    let num_confirmations = client.get_num_confirmations().await?;
    let pending = client.pending_requests().await?;

    if pending.is_empty() {
        println!("No pending requests for {account}");
        return Ok(());
    }

    println!(
        "{} pending request(s) for {account} ({num_confirmations} confirmation(s) required)\n",
        pending.len()
    );
    for entry in &pending {
        let confirmations = client.get_confirmations(entry.id).await?;
        println!("Request #{} -> {}", entry.id, entry.request.receiver_id);
        println!(
            "  Confirmed by {} of {num_confirmations} required",
            confirmations.len()
        );
        for explanation in explainer.explain_request(&entry.request, account).await {
            println!("  {}", explanation.full_description);
        }
        println!();
    }

    Ok(())
}
