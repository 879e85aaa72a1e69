//! CLI utility functions for terminal interaction and formatting.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use console::{style, Term};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::chain::NearRpcClient;
use crate::config::Config;
use crate::contract::SputnikDao;
use crate::indexer::IndexerClient;
use crate::types::{Proposal, ProposalStatus};

/// Prompt for confirmation with default behavior based on `no_prompt` flag.
/// If `no_prompt` is true, returns true without prompting.
pub fn confirm(message: &str, no_prompt: bool) -> bool {
    if no_prompt {
        return true;
    }

    Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .unwrap_or(false)
}

/// Create a spinner progress bar with message.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(template);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn print_success(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("✓").green().bold(), message));
}

pub fn print_error(message: &str) {
    let term = Term::stderr();
    let _ = term.write_line(&format!("{} {}", style("✗").red().bold(), message));
}

pub fn print_info(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("ℹ").blue().bold(), message));
}

pub fn print_warning(message: &str) {
    let term = Term::stdout();
    let _ = term.write_line(&format!("{} {}", style("⚠").yellow().bold(), message));
}

/// Create a styled table for CLI output.
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a table with custom headers.
pub fn create_table_with_headers(headers: &[&str]) -> Table {
    let mut table = create_table();
    table.set_header(headers.iter().map(|h| style(*h).bold().to_string()));
    table
}

/// DAO contract over the configured RPC endpoint
pub fn connect(config: &Config) -> anyhow::Result<Arc<SputnikDao>> {
    let client = NearRpcClient::new(config.rpc_endpoint.clone())
        .map_err(|e| anyhow::anyhow!("Failed to create RPC client: {}", e))?
        .with_retry(config.retry.clone())
        .with_rate_limit(config.rate_limit_per_second);
    Ok(Arc::new(SputnikDao::new(client)))
}

/// Indexer client, if an indexer URL is configured
pub fn indexer(config: &Config) -> anyhow::Result<Option<IndexerClient>> {
    let Some(url) = &config.indexer_url else {
        return Ok(None);
    };
    let mut client = IndexerClient::new(url.clone())?;
    if let Some(kyc) = &config.kyc_url {
        client = client.with_kyc_url(kyc.clone())?;
    }
    Ok(Some(client))
}

/// Shorten long account ids for table cells
pub fn format_account(account: &str) -> String {
    if account.chars().count() <= 32 {
        return account.to_string();
    }
    let head: String = account.chars().take(14).collect();
    let tail: String = account.chars().rev().take(14).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{}...{}", head, tail)
}

/// Proposal title from its description, else its first line
pub fn proposal_title(proposal: &Proposal) -> String {
    crate::utils::decode_field(&proposal.description, "title").unwrap_or_else(|| {
        proposal
            .description
            .split("<br>")
            .next()
            .unwrap_or_default()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    })
}

pub fn styled_status(status: ProposalStatus) -> String {
    let label = status.as_str();
    match status {
        ProposalStatus::Approved => style(label).green().to_string(),
        ProposalStatus::Rejected | ProposalStatus::Failed => style(label).red().to_string(),
        ProposalStatus::InProgress => style(label).yellow().to_string(),
        _ => style(label).dim().to_string(),
    }
}

/// Format a nanosecond timestamp for display
pub fn format_timestamp(proposal: &Proposal) -> String {
    proposal
        .submitted_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Truncate `text` to `max` characters with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}
