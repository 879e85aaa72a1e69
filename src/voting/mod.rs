//! Vote casting flow for a single proposal
//!
//! ```text
//! NotVoted --request--> PendingConfirmation --confirm--> Submitting --poll--> Voted
//!     ^                        |                             |
//!     +--------cancel----------+------timeout / cancel-------+
//! ```
//!
//! The proposal is re-read just before `act_proposal` is submitted, then
//! polled until the voter's entry differs from that snapshot. Polling is
//! bounded by an attempt count and a deadline, and can be cancelled.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::contract::{DaoContract, ProposalActor};
use crate::core::constants::{
    INSUFFICIENT_BALANCE_LIMIT_NEAR, VOTE_POLL_INTERVAL_MS, VOTE_POLL_MAX_ATTEMPTS,
    VOTE_POLL_TIMEOUT_SECS,
};
use crate::errors::{
    InsufficientBalance, InvalidVoteTransition, TreasuryResult, VoteCancelled, VoteTimeout,
};
use crate::events::{DashboardEvent, RefreshBus};
use crate::types::{AccountId, ActProposalRequest, Proposal, Vote};
use crate::utils::balance::NearToken;

/// Where a vote is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NotVoted,
    /// Waiting for the user to confirm
    PendingConfirmation(Vote),
    /// `act_proposal` sent, waiting for the vote to appear on chain
    Submitting(Vote),
    Voted(Vote),
}

impl VoteState {
    pub fn vote(&self) -> Option<Vote> {
        match self {
            VoteState::NotVoted => None,
            VoteState::PendingConfirmation(v) | VoteState::Submitting(v) | VoteState::Voted(v) => {
                Some(*v)
            }
        }
    }
}

impl fmt::Display for VoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteState::NotVoted => write!(f, "not voted"),
            VoteState::PendingConfirmation(v) => write!(f, "awaiting confirmation of {}", v),
            VoteState::Submitting(v) => write!(f, "submitting {}", v),
            VoteState::Voted(v) => write!(f, "voted {}", v),
        }
    }
}

/// Bounds of the post-submission poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(VOTE_POLL_INTERVAL_MS),
            max_attempts: VOTE_POLL_MAX_ATTEMPTS,
            timeout: Duration::from_secs(VOTE_POLL_TIMEOUT_SECS),
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Cloneable cancellation flag shared between a poll and its owner
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`CancelToken::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Balance precondition for casting a vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceCheck {
    /// Balance of the voting account
    pub available: NearToken,
    /// Minimum balance the voter and the treasury must each hold
    pub limit: NearToken,
    /// Treasury balance, when known
    pub treasury: Option<NearToken>,
    /// Native NEAR amount an approval would pay out of the treasury
    pub transfer_amount: Option<NearToken>,
}

impl BalanceCheck {
    pub fn new(available: NearToken, limit: NearToken) -> Self {
        Self {
            available,
            limit,
            treasury: None,
            transfer_amount: None,
        }
    }

    pub fn with_treasury(mut self, treasury_balance: NearToken) -> Self {
        self.treasury = Some(treasury_balance);
        self
    }

    /// Also require the treasury to hold `amount` when approving
    pub fn with_transfer(mut self, treasury_balance: NearToken, amount: NearToken) -> Self {
        self.treasury = Some(treasury_balance);
        self.transfer_amount = Some(amount);
        self
    }

    /// The default gas limit
    pub fn default_limit() -> NearToken {
        INSUFFICIENT_BALANCE_LIMIT_NEAR
            .parse()
            .unwrap_or(NearToken::ZERO)
    }

    /// Build the check for `voter` acting on `proposal`, fetching the
    /// voter's and the treasury's balances
    pub async fn fetch<C>(
        contract: &C,
        voter: &str,
        dao_id: &str,
        proposal: &Proposal,
        limit: NearToken,
    ) -> TreasuryResult<Self>
    where
        C: DaoContract + ?Sized,
    {
        let (available, treasury) = tokio::try_join!(
            contract.account_balance(voter),
            contract.account_balance(dao_id)
        )?;
        let check = Self::new(available, limit);
        Ok(match proposal.kind.native_transfer_amount() {
            Some(amount) => check.with_transfer(treasury, NearToken::from_yocto(amount)),
            None => check.with_treasury(treasury),
        })
    }

    /// Fail if `vote` cannot be afforded
    pub fn verify(&self, vote: Vote) -> Result<(), InsufficientBalance> {
        if self.available < self.limit {
            return Err(InsufficientBalance::with_amounts(
                format!(
                    "{} available, at least {} is needed to pay for the vote",
                    self.available, self.limit
                ),
                self.limit,
                self.available,
            ));
        }
        let Some(treasury) = self.treasury else {
            return Ok(());
        };
        if treasury < self.limit {
            return Err(InsufficientBalance::with_amounts(
                format!(
                    "treasury holds {}, below the {} needed to act on proposals",
                    treasury, self.limit
                ),
                self.limit,
                treasury,
            ));
        }
        if let (Vote::Approve, Some(amount)) = (vote, self.transfer_amount) {
            if treasury < amount {
                return Err(InsufficientBalance::with_amounts(
                    format!(
                        "treasury holds {} but the transfer pays out {}",
                        treasury, amount
                    ),
                    amount,
                    treasury,
                ));
            }
        }
        Ok(())
    }
}

/// Poll `proposal_id` until `voter`'s entry in its votes differs from
/// `snapshot`. Votes cast by other accounts are ignored.
///
/// The first poll happens one `interval` after the call. Transient read
/// failures are logged and count as an attempt.
#[allow(clippy::too_many_arguments)]
pub async fn wait_for_vote_change<C>(
    contract: &C,
    dao_id: &str,
    proposal_id: u64,
    voter: &str,
    vote: Vote,
    snapshot: &BTreeMap<AccountId, Vote>,
    poll: &PollConfig,
    cancel: &CancelToken,
) -> TreasuryResult<Proposal>
where
    C: DaoContract + ?Sized,
{
    let deadline = tokio::time::Instant::now() + poll.timeout;
    let before = snapshot.get(voter);
    let mut attempts = 0u32;

    while attempts < poll.max_attempts {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(proposal_id, "vote poll cancelled");
                return Err(VoteCancelled::with_proposal(proposal_id).into());
            }
            _ = tokio::time::sleep_until(deadline) => break,
            _ = tokio::time::sleep(poll.interval) => {}
        }
        attempts += 1;

        let fetched = tokio::select! {
            _ = cancel.cancelled() => {
                info!(proposal_id, attempts, "vote poll cancelled during read");
                return Err(VoteCancelled::with_proposal(proposal_id).into());
            }
            fetched = tokio::time::timeout_at(deadline, contract.get_proposal(dao_id, proposal_id)) => fetched,
        };
        match fetched {
            Err(_) => break,
            Ok(Ok(proposal)) if proposal.votes.get(voter) != before => {
                debug!(proposal_id, attempts, voter, "vote observed");
                return Ok(proposal);
            }
            Ok(Ok(_)) => debug!(proposal_id, attempts, voter, "vote not yet visible"),
            Ok(Err(e)) if e.is_retryable() => {
                warn!(proposal_id, attempts, "vote poll read failed: {}", e)
            }
            Ok(Err(e)) => return Err(e),
        }
    }

    warn!(proposal_id, attempts, "vote not observed before poll limit");
    Err(VoteTimeout::with_details(proposal_id, vote, attempts).into())
}

/// Drives one account's vote on one proposal
#[derive(Debug)]
pub struct VoteFlow {
    dao_id: String,
    proposal: Proposal,
    state: VoteState,
    bus: Option<RefreshBus>,
}

impl VoteFlow {
    pub fn new(dao_id: impl Into<String>, proposal: Proposal) -> Self {
        Self {
            dao_id: dao_id.into(),
            proposal,
            state: VoteState::NotVoted,
            bus: None,
        }
    }

    /// Publish `VoteRecorded` on `bus` once a vote lands
    pub fn with_bus(mut self, bus: RefreshBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    /// Ask to cast `vote`. Leaves the state untouched if the balance
    /// check fails.
    pub fn request(&mut self, vote: Vote, balance: &BalanceCheck) -> TreasuryResult<VoteState> {
        if self.state != VoteState::NotVoted {
            return Err(InvalidVoteTransition::new(format!("request {}", vote), self.state.to_string()).into());
        }
        balance.verify(vote)?;
        self.state = VoteState::PendingConfirmation(vote);
        Ok(self.state)
    }

    /// Abandon a pending confirmation
    pub fn cancel(&mut self) -> TreasuryResult<VoteState> {
        match self.state {
            VoteState::PendingConfirmation(_) => {
                self.state = VoteState::NotVoted;
                Ok(self.state)
            }
            state => Err(InvalidVoteTransition::new("cancel", state.to_string()).into()),
        }
    }

    /// Submit the pending vote and wait for it to appear on chain.
    ///
    /// On failure, timeout or cancellation the flow returns to `NotVoted`.
    pub async fn confirm<C, A>(
        &mut self,
        contract: &C,
        actor: &A,
        poll: &PollConfig,
        cancel: &CancelToken,
    ) -> TreasuryResult<&Proposal>
    where
        C: DaoContract + ?Sized,
        A: ProposalActor + ?Sized,
    {
        let VoteState::PendingConfirmation(vote) = self.state else {
            return Err(InvalidVoteTransition::new("confirm", self.state.to_string()).into());
        };

        // Votes may have landed since the flow was built
        let current = match contract.get_proposal(&self.dao_id, self.proposal.id).await {
            Ok(current) => current,
            Err(e) => {
                self.state = VoteState::NotVoted;
                return Err(e);
            }
        };
        let snapshot = current.votes.clone();
        self.proposal = current;

        let request = ActProposalRequest::new(self.dao_id.clone(), &self.proposal, vote.action());
        self.state = VoteState::Submitting(vote);
        info!(
            dao_id = %self.dao_id,
            proposal_id = self.proposal.id,
            voter = actor.account_id(),
            %vote,
            "submitting vote"
        );

        if let Err(e) = actor.act_proposal(&request).await {
            self.state = VoteState::NotVoted;
            return Err(e);
        }

        let voted = wait_for_vote_change(
            contract,
            &self.dao_id,
            self.proposal.id,
            actor.account_id(),
            vote,
            &snapshot,
            poll,
            cancel,
        )
        .await;
        match voted {
            Ok(updated) => {
                self.proposal = updated;
                self.state = VoteState::Voted(vote);
                if let Some(bus) = &self.bus {
                    bus.publish(DashboardEvent::VoteRecorded {
                        proposal_id: self.proposal.id,
                        vote,
                    });
                    bus.publish(DashboardEvent::RefreshProposals { category: None });
                }
                Ok(&self.proposal)
            }
            Err(e) => {
                self.state = VoteState::NotVoted;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn near(s: &str) -> NearToken {
        s.parse().unwrap()
    }

    #[test]
    fn test_balance_below_limit() {
        let check = BalanceCheck::new(near("0.05"), near("0.3"));
        let err = check.verify(Vote::Reject).unwrap_err();
        assert_eq!(err.required, Some(near("0.3")));
        assert_eq!(err.available, Some(near("0.05")));
    }

    #[test]
    fn test_transfer_amount_only_matters_for_approval() {
        let check = BalanceCheck::new(near("5"), near("0.3")).with_transfer(near("10"), near("25"));
        assert!(check.verify(Vote::Approve).is_err());
        assert!(check.verify(Vote::Reject).is_ok());
        assert!(check.verify(Vote::Remove).is_ok());
    }

    #[test]
    fn test_treasury_below_limit() {
        let check = BalanceCheck::new(near("2"), near("0.3")).with_treasury(near("0.05"));
        for vote in [Vote::Approve, Vote::Reject, Vote::Remove] {
            let err = check.verify(vote).unwrap_err();
            assert_eq!(err.required, Some(near("0.3")));
            assert_eq!(err.available, Some(near("0.05")));
        }
        assert!(BalanceCheck::new(near("2"), near("0.3"))
            .with_treasury(near("0.3"))
            .verify(Vote::Approve)
            .is_ok());
    }

    #[test]
    fn test_default_limit() {
        assert_eq!(BalanceCheck::default_limit(), near("0.3"));
    }

    #[test]
    fn test_cancel_only_from_pending() {
        let proposal: Proposal = serde_json::from_value(serde_json::json!({
            "id": 1, "kind": "Vote", "status": "InProgress"
        }))
        .unwrap();
        let mut flow = VoteFlow::new("dao.near", proposal);
        assert!(flow.cancel().is_err());

        let ok = BalanceCheck::new(near("1"), near("0.3"));
        assert_eq!(
            flow.request(Vote::Approve, &ok).unwrap(),
            VoteState::PendingConfirmation(Vote::Approve)
        );
        assert!(flow.request(Vote::Reject, &ok).is_err());
        assert_eq!(flow.cancel().unwrap(), VoteState::NotVoted);
    }

    #[tokio::test]
    async fn test_cancel_token() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }
}
