//! Approver and threshold lookup for the category pages.

use clap::Args;

use crate::cli::utils::{connect, create_table_with_headers, print_info, spinner};
use crate::config::Config;
use crate::contract::DaoContract;
use crate::queries::{category_approvers, ApproverGroup, ApproverPurpose};
use crate::types::ProposalCategory;

#[derive(Args, Clone)]
pub struct ApproversCommand {
    /// Category page; all categories when omitted
    #[arg(short, long)]
    pub category: Option<ProposalCategory>,

    /// Show who may remove proposals instead of who votes on them
    #[arg(long)]
    pub remove: bool,
}

pub async fn execute(cmd: ApproversCommand, config: &Config) -> anyhow::Result<()> {
    let dao_id = config.require_dao()?;
    let contract = connect(config)?;

    let sp = spinner(&format!("Fetching policy of {}...", dao_id));
    let policy = contract
        .get_policy(dao_id)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to fetch policy: {}", e))?;
    sp.finish_and_clear();

    let purpose = if cmd.remove {
        ApproverPurpose::Remove
    } else {
        ApproverPurpose::Vote
    };
    let categories = match cmd.category {
        Some(category) => vec![category],
        None => ProposalCategory::ALL.to_vec(),
    };

    let mut table = create_table_with_headers(&["Category", "Approvers", "Required", "Members"]);
    for category in categories {
        let group = category_approvers(Some(&policy), category, purpose);
        table.add_row(vec![
            category.to_string(),
            group.len().to_string(),
            threshold_label(&group),
            member_list(&group),
        ]);
    }

    println!("\n{table}");
    if cmd.remove {
        print_info("Members listed may delete proposals in these categories");
    }
    Ok(())
}

fn threshold_label(group: &ApproverGroup) -> String {
    if group.is_empty() && !group.everyone_has_access {
        return "-".to_string();
    }
    format!("{} of {}", group.required_votes, group.len())
}

fn member_list(group: &ApproverGroup) -> String {
    let mut members = group.approver_accounts.join("\n");
    if group.everyone_has_access {
        if !members.is_empty() {
            members.push('\n');
        }
        members.push_str("(everyone)");
    }
    members
}
