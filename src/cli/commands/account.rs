//! Account and token lookups: KYC state, token metadata and balances.

use clap::Args;

use crate::cli::utils::{connect, indexer, print_success, print_warning, spinner};
use crate::config::Config;
use crate::contract::DaoContract;
use crate::types::KycState;

#[derive(Args, Clone)]
pub struct KycCommand {
    /// Account to look up
    pub account: String,
}

#[derive(Args, Clone)]
pub struct TokenCommand {
    /// Token contract; `near` for native NEAR
    pub contract: String,
}

#[derive(Args, Clone)]
pub struct BalanceCommand {
    /// Account to look up; the configured DAO when omitted
    pub account: Option<String>,
}

pub async fn kyc(cmd: KycCommand, config: &Config) -> anyhow::Result<()> {
    let Some(client) = indexer(config)? else {
        anyhow::bail!("KYC lookup needs an indexer configuration");
    };

    let sp = spinner(&format!("Checking KYC status of {}...", cmd.account));
    let result = client.kyc_status(&cmd.account).await;
    sp.finish_and_clear();
    let status = result.map_err(|e| anyhow::anyhow!("Failed to fetch KYC status: {}", e))?;

    match status.kyc_status {
        KycState::Approved => print_success(&format!("{}: {}", cmd.account, status.kyc_status)),
        _ => print_warning(&format!("{}: {}", cmd.account, status.kyc_status)),
    }
    Ok(())
}

pub async fn token(cmd: TokenCommand, config: &Config) -> anyhow::Result<()> {
    let contract = connect(config)?;

    let sp = spinner(&format!("Fetching metadata of {}...", cmd.contract));
    let result = contract.ft_metadata(&cmd.contract).await;
    sp.finish_and_clear();
    let metadata = result.map_err(|e| anyhow::anyhow!("Failed to fetch token metadata: {}", e))?;

    println!("\nToken {}", cmd.contract);
    println!("═════════════════════════════════════════");
    println!("Name:      {}", metadata.name);
    println!("Symbol:    {}", metadata.symbol);
    println!("Decimals:  {}", metadata.decimals);
    println!("Standard:  {}", metadata.spec);
    if let Some(reference) = &metadata.reference {
        println!("Reference: {}", reference);
    }
    Ok(())
}

pub async fn balance(cmd: BalanceCommand, config: &Config) -> anyhow::Result<()> {
    let account = match &cmd.account {
        Some(account) => account.as_str(),
        None => config.require_dao()?,
    };
    let contract = connect(config)?;

    let sp = spinner(&format!("Fetching balance of {}...", account));
    let result = contract.account_balance(account).await;
    sp.finish_and_clear();
    let amount = result.map_err(|e| anyhow::anyhow!("Failed to fetch balance: {}", e))?;

    println!("{}: {}", account, amount);
    let limit = config.balance_limit()?;
    if amount < limit {
        print_warning(&format!("Below {} needed to pay for votes", limit));
    }
    Ok(())
}
