//! Command-line interface for Sputnik-DAO treasuries
//!
//! # Commands
//!
//! - `proposals` - List and inspect treasury requests
//! - `approvers` - Show who votes on a category and how many votes pass it
//! - `vote` - Approve, reject or remove a proposal
//! - `export` - CSV export of a DAO's proposals
//! - `kyc`, `token`, `balance` - Account and token lookups

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, Network};
use crate::logging::LogFormat;

pub mod commands;
pub mod utils;

/// Sputnik-DAO treasury CLI
#[derive(Parser)]
#[command(name = "treasury")]
#[command(version)]
#[command(about = "Inspect and vote on Sputnik-DAO treasury proposals", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Network to connect to (mainnet, testnet, local)
    #[arg(short, long, global = true)]
    pub network: Option<Network>,

    /// Custom RPC endpoint (overrides --network)
    #[arg(long, global = true)]
    pub rpc: Option<String>,

    /// Proposal indexer URL
    #[arg(long, global = true)]
    pub indexer: Option<String>,

    /// Treasury DAO account, e.g. `treasury.sputnik-dao.near`
    #[arg(short, long, global = true)]
    pub dao: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Don't prompt for confirmations (auto-approve)
    #[arg(long, global = true)]
    pub no_prompt: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format (text, json, compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Effective configuration: file, then environment, then flags
    pub fn settings(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(network) = self.network {
            config = config.with_network(network);
        }
        if let Some(rpc) = &self.rpc {
            config = config.with_endpoint(rpc.clone());
        }
        if let Some(indexer) = &self.indexer {
            config = config.with_indexer(Some(indexer.clone()));
        }
        if let Some(dao) = &self.dao {
            config = config.with_dao(dao.clone());
        }
        if self.verbose {
            config = config.with_debug(true);
        }
        if let Some(format) = self.log_format {
            config.logging.format = format;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List and inspect proposals
    #[command(alias = "p")]
    Proposals(commands::proposals::ProposalsCommand),

    /// Show approvers and the vote threshold of a category
    #[command(alias = "a")]
    Approvers(commands::approvers::ApproversCommand),

    /// Vote on a proposal
    #[command(alias = "v")]
    Vote(commands::vote::VoteCommand),

    /// Export proposals as CSV
    Export(commands::export::ExportCommand),

    /// KYC verification state of an account
    Kyc(commands::account::KycCommand),

    /// Fungible token metadata
    Token(commands::account::TokenCommand),

    /// NEAR balance of an account
    Balance(commands::account::BalanceCommand),
}

/// Run the CLI application
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.settings()?;
    crate::logging::init_logging(&config.logging);

    match &cli.command {
        Commands::Proposals(cmd) => commands::proposals::execute(cmd.clone(), &config).await,
        Commands::Approvers(cmd) => commands::approvers::execute(cmd.clone(), &config).await,
        Commands::Vote(cmd) => commands::vote::execute(cmd.clone(), &cli, &config).await,
        Commands::Export(cmd) => commands::export::execute(cmd.clone(), &cli, &config).await,
        Commands::Kyc(cmd) => commands::account::kyc(cmd.clone(), &config).await,
        Commands::Token(cmd) => commands::account::token(cmd.clone(), &config).await,
        Commands::Balance(cmd) => commands::account::balance(cmd.clone(), &config).await,
    }
}
