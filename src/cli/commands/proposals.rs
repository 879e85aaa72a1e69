//! Proposal listing and inspection.

use clap::{Args, Subcommand, ValueEnum};
use std::sync::Arc;

use crate::cli::utils::{
    connect, create_table_with_headers, format_account, format_timestamp, indexer, print_info,
    print_warning, proposal_title, spinner, styled_status, truncate,
};
use crate::config::Config;
use crate::contract::DaoContract;
use crate::queries::proposals::now_nanos;
use crate::queries::{required_votes_for, FeedQuery, FeedSource, ProposalFeed};
use crate::types::{ProposalCategory, ProposalStatus};
use crate::utils::decode_fields;

/// Proposal command container
#[derive(Args, Clone)]
pub struct ProposalsCommand {
    #[command(subcommand)]
    pub command: ProposalsCommands,
}

/// Which table of a category page to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Tab {
    /// Proposals still being voted on
    Pending,
    /// Finalized proposals
    History,
    /// Every status
    All,
}

impl Tab {
    fn statuses(&self) -> Vec<ProposalStatus> {
        match self {
            Tab::Pending => ProposalStatus::PENDING.to_vec(),
            Tab::History => ProposalStatus::HISTORY.to_vec(),
            Tab::All => Vec::new(),
        }
    }
}

/// Available proposal operations
#[derive(Subcommand, Clone)]
pub enum ProposalsCommands {
    /// List proposals, newest first
    List {
        /// Category page (payments, stake-delegation, asset-exchange, lockup, settings)
        #[arg(short, long)]
        category: Option<ProposalCategory>,
        /// Pending requests or history
        #[arg(short, long, value_enum, default_value = "pending")]
        tab: Tab,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
        /// Proposals per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<usize>,
        /// Where to read proposals from (indexer, contract, auto)
        #[arg(long)]
        source: Option<FeedSource>,
    },

    /// Show a single proposal
    Show {
        /// Proposal ID
        id: u64,
    },
}

/// Execute proposal commands
pub async fn execute(cmd: ProposalsCommand, config: &Config) -> anyhow::Result<()> {
    match cmd.command {
        ProposalsCommands::List {
            category,
            tab,
            page,
            page_size,
            source,
        } => {
            let page_size = page_size.unwrap_or(config.page_size);
            list_proposals(category, tab, page, page_size, source, config).await
        }
        ProposalsCommands::Show { id } => show_proposal(id, config).await,
    }
}

/// List one page of proposals
async fn list_proposals(
    category: Option<ProposalCategory>,
    tab: Tab,
    page: usize,
    page_size: usize,
    source: Option<FeedSource>,
    config: &Config,
) -> anyhow::Result<()> {
    if page == 0 {
        anyhow::bail!("Pages are numbered from 1");
    }
    let dao_id = config.require_dao()?;
    let contract = connect(config)?;

    let sp = spinner("Fetching policy...");
    let policy = contract
        .get_policy(dao_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch policy: {}", e))?;
    sp.finish_and_clear();

    let mut feed = ProposalFeed::new(contract.clone() as Arc<dyn DaoContract>)
        .with_source(source.unwrap_or(config.feed_source));
    if let Some(client) = indexer(config)? {
        feed = feed.with_indexer(client);
    }

    let mut query = FeedQuery::new(dao_id)
        .with_statuses(tab.statuses())
        .with_page(page - 1, page_size)
        .with_proposal_period(policy.proposal_period_ns());
    if let Some(category) = category {
        query = query.with_category(category);
    }

    let sp = spinner(&format!("Fetching proposals of {}...", dao_id));
    let result = feed.page(&query).await;
    sp.finish_and_clear();
    let page_data = result.map_err(|e| anyhow::anyhow!("Failed to fetch proposals: {}", e))?;

    if page_data.proposals.is_empty() {
        print_info("No proposals found");
        return Ok(());
    }

    let now = now_nanos();
    let mut table =
        create_table_with_headers(&["ID", "Created", "Title", "Proposer", "Kind", "Votes", "Status"]);
    for proposal in &page_data.proposals {
        let required = required_votes_for(Some(&policy), &proposal.kind);
        table.add_row(vec![
            proposal.id.to_string(),
            format_timestamp(proposal),
            truncate(&proposal_title(proposal), 48),
            format_account(&proposal.proposer),
            proposal.kind.name.clone(),
            format!("{}/{} ✓  {} ✗", proposal.approvals(), required, proposal.rejections()),
            styled_status(proposal.effective_status(policy.proposal_period_ns(), now)),
        ]);
    }

    println!("\n{table}");
    let pages = page_data.total.div_ceil(page_size as u64).max(1);
    println!(
        "\nPage {} of {} ({} proposals, via {})",
        page, pages, page_data.total, page_data.source
    );

    Ok(())
}

/// Show a single proposal
async fn show_proposal(id: u64, config: &Config) -> anyhow::Result<()> {
    let dao_id = config.require_dao()?;
    let contract = connect(config)?;

    let sp = spinner(&format!("Fetching proposal {}...", id));
    let result = tokio::try_join!(contract.get_proposal(dao_id, id), contract.get_policy(dao_id));
    sp.finish_and_clear();
    let (proposal, policy) = result?;

    let now = now_nanos();
    let status = proposal.effective_status(policy.proposal_period_ns(), now);
    let required = required_votes_for(Some(&policy), &proposal.kind);

    println!("\nProposal #{}", proposal.id);
    println!("═════════════════════════════════════════");
    println!("Title:       {}", proposal_title(&proposal));
    println!("Proposer:    {}", proposal.proposer);
    println!("Kind:        {}", proposal.kind.name);
    println!("Status:      {}", styled_status(status));
    println!("Created:     {}", format_timestamp(&proposal));
    println!(
        "Votes:       {} approve, {} reject, {} required",
        proposal.approvals(),
        proposal.rejections(),
        required
    );
    if let Some((token_id, amount)) = proposal.kind.transfer() {
        match contract.ft_metadata(token_id).await {
            Ok(metadata) => println!("Amount:      {}", metadata.format_amount(amount)),
            Err(e) => {
                tracing::debug!(token_id, "token metadata unavailable: {}", e);
                println!("Amount:      {} (raw units of {})", amount, token_id);
            }
        }
    }

    let fields = decode_fields(&proposal.description);
    if !fields.is_empty() {
        println!("\nDetails");
        for (key, value) in fields {
            println!("  {:<18} {}", format!("{}:", key), value);
        }
    }

    if let Some(payload) = &proposal.kind.payload {
        println!("\nPayload");
        println!("{}", serde_json::to_string_pretty(payload)?);
    }

    if proposal.votes.is_empty() {
        print_warning("No votes yet");
    } else {
        let mut table = create_table_with_headers(&["Approver", "Vote"]);
        for (account, vote) in &proposal.votes {
            table.add_row(vec![account.clone(), vote.to_string()]);
        }
        println!("\n{table}");
    }

    Ok(())
}
