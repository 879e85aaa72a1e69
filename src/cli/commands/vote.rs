//! Vote on a proposal.
//!
//! The CLI holds no keys: the `act_proposal` call is printed as a
//! `near-cli` command, and the vote is confirmed by polling the proposal
//! until the signed transaction lands.

use async_trait::async_trait;
use clap::Args;
use std::time::Duration;

use crate::cli::utils::{
    confirm, connect, print_error, print_info, print_success, print_warning, proposal_title,
    spinner,
};
use crate::cli::Cli;
use crate::config::Config;
use crate::contract::{DaoContract, ProposalActor};
use crate::core::constants::ACT_PROPOSAL_GAS;
use crate::errors::{TreasuryError, TreasuryResult};
use crate::queries::{approvers_and_threshold, ApproverPurpose};
use crate::types::{is_valid_account_id, ActProposalRequest, Vote};
use crate::voting::{BalanceCheck, CancelToken, VoteFlow};

#[derive(Args, Clone)]
pub struct VoteCommand {
    /// Proposal ID
    pub id: u64,

    /// approve, reject or remove
    pub vote: Vote,

    /// Voting account
    #[arg(short, long, env = "TREASURY_ACCOUNT")]
    pub account: Option<String>,

    /// Seconds to wait for the vote to land (defaults to the configured poll timeout)
    #[arg(long)]
    pub wait: Option<u64>,
}

/// Prints the `act_proposal` call for signing elsewhere
#[derive(Debug, Clone)]
pub struct PayloadPrinter {
    account_id: String,
}

impl PayloadPrinter {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }

    /// `near-cli` invocation that submits `request`
    pub fn command_line(&self, request: &ActProposalRequest) -> String {
        format!(
            "near call {} act_proposal '{}' --accountId {} --gas {}",
            request.dao_id,
            request.args(),
            self.account_id,
            ACT_PROPOSAL_GAS
        )
    }
}

#[async_trait]
impl ProposalActor for PayloadPrinter {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    async fn act_proposal(&self, request: &ActProposalRequest) -> TreasuryResult<()> {
        println!("\nSign and submit this transaction:\n");
        println!("  {}\n", self.command_line(request));
        Ok(())
    }
}

pub async fn execute(cmd: VoteCommand, cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let dao_id = config.require_dao()?;
    let Some(account) = cmd.account.as_deref() else {
        anyhow::bail!("No voting account; pass --account or set TREASURY_ACCOUNT");
    };
    if !is_valid_account_id(account) {
        anyhow::bail!("'{}' is not a valid NEAR account id", account);
    }
    let contract = connect(config)?;

    let sp = spinner(&format!("Fetching proposal {}...", cmd.id));
    let result = tokio::try_join!(contract.get_proposal(dao_id, cmd.id), contract.get_policy(dao_id));
    sp.finish_and_clear();
    let (proposal, policy) = result?;

    if proposal.status.is_final() {
        anyhow::bail!("Proposal {} is already {}", proposal.id, proposal.status);
    }
    if let Some(existing) = proposal.vote_of(account) {
        print_warning(&format!("{} already voted {} on this proposal", account, existing));
    }

    let purpose = match cmd.vote {
        Vote::Remove => ApproverPurpose::Remove,
        Vote::Approve | Vote::Reject => ApproverPurpose::Vote,
    };
    let group = approvers_and_threshold(Some(&policy), &proposal.kind.permission_label(), purpose);
    if !group.contains(account) && !group.everyone_has_access {
        print_warning(&format!(
            "{} is not an approver for {} proposals; the contract will reject this vote",
            account, proposal.kind.name
        ));
    }

    let limit = config.balance_limit()?;
    let balance = BalanceCheck::fetch(contract.as_ref(), account, dao_id, &proposal, limit).await?;

    let mut flow = VoteFlow::new(dao_id, proposal);
    if let Err(e) = flow.request(cmd.vote, &balance) {
        if e.is_insufficient_balance() {
            print_error(&e.to_string());
        }
        return Err(e.into());
    }

    let prompt = format!(
        "{} proposal #{} \"{}\" as {}?",
        cmd.vote,
        flow.proposal().id,
        proposal_title(flow.proposal()),
        account
    );
    if !confirm(&prompt, cli.no_prompt) {
        flow.cancel()?;
        print_info("Vote cancelled");
        return Ok(());
    }

    let mut poll = config.poll_config();
    if let Some(wait) = cmd.wait {
        poll = poll.with_timeout(Duration::from_secs(wait));
    }

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let actor = PayloadPrinter::new(account);
    let sp = spinner("Waiting for the vote to appear on chain...");
    let outcome = flow.confirm(contract.as_ref(), &actor, &poll, &cancel).await;
    sp.finish_and_clear();
    interrupt.abort();

    match outcome {
        Ok(updated) => {
            print_success(&format!(
                "Vote recorded: {} approve, {} reject, {} required",
                updated.approvals(),
                updated.rejections(),
                group.required_votes
            ));
            Ok(())
        }
        Err(TreasuryError::VoteCancelled(_)) => {
            print_info("Stopped waiting; the vote may still land");
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            Err(e.into())
        }
    }
}
