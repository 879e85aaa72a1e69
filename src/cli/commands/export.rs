//! CSV export of a DAO's proposals through the indexer.

use clap::Args;
use std::path::PathBuf;

use crate::cli::utils::{confirm, indexer, print_info, print_success, spinner};
use crate::cli::Cli;
use crate::config::Config;
use crate::types::ProposalCategory;

#[derive(Args, Clone)]
pub struct ExportCommand {
    /// Category page to export; every proposal when omitted
    #[arg(short, long)]
    pub category: Option<ProposalCategory>,

    /// Write the CSV to this file instead of printing the download URL
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(cmd: ExportCommand, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let dao_id = config.require_dao()?;
    let Some(client) = indexer(config)? else {
        anyhow::bail!("CSV export needs an indexer; pass --indexer or set TREASURY_INDEXER_URL");
    };

    let Some(path) = cmd.output else {
        let url = client.csv_export_url(dao_id, cmd.category)?;
        println!("{}", url);
        return Ok(());
    };

    if path.exists() && !confirm(&format!("Overwrite {}?", path.display()), cli.no_prompt) {
        print_info("Export cancelled");
        return Ok(());
    }

    let sp = spinner(&format!("Downloading proposals of {}...", dao_id));
    let result = client.export_csv(dao_id, cmd.category).await;
    sp.finish_and_clear();
    let csv = result.map_err(|e| anyhow::anyhow!("Failed to export proposals: {}", e))?;

    tokio::fs::write(&path, &csv).await?;
    let rows = csv.lines().count().saturating_sub(1);
    print_success(&format!("Wrote {} proposals to {}", rows, path.display()));
    Ok(())
}
