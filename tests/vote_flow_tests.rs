//! Vote flow from request to on-chain confirmation.

mod common;

use common::{near, proposal, MockDao, DAO, VOTER};
use sputnik_treasury::{
    wait_for_vote_change, ActProposalRequest, BalanceCheck, CancelToken, DashboardEvent,
    PollConfig, ProposalActor, ProposalStatus, RefreshBus, TreasuryError, Vote, VoteFlow,
    VoteState,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn fast_poll() -> PollConfig {
    PollConfig::default()
        .with_interval(Duration::from_millis(20))
        .with_max_attempts(5)
        .with_timeout(Duration::from_secs(2))
}

fn funded_dao() -> MockDao {
    MockDao::new(vec![
        proposal(3, "Transfer", ProposalStatus::InProgress),
        proposal(4, "Vote", ProposalStatus::InProgress),
    ])
    .with_balance(VOTER, near("2"))
    .with_balance(DAO, near("50"))
}

async fn requested_flow(dao: &MockDao, id: u64, vote: Vote) -> VoteFlow {
    let proposal = dao.snapshot(id);
    let check = BalanceCheck::fetch(dao, VOTER, DAO, &proposal, near("0.3"))
        .await
        .unwrap();
    let mut flow = VoteFlow::new(DAO, proposal);
    assert_eq!(flow.request(vote, &check).unwrap(), VoteState::PendingConfirmation(vote));
    flow
}

#[tokio::test]
async fn test_poll_sees_vote_on_first_tick() {
    let dao = funded_dao();
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;
    assert!(flow.proposal().votes.is_empty());

    let updated = flow
        .confirm(&dao, &dao, &fast_poll(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(updated.vote_of(VOTER), Some(Vote::Approve));
    assert_eq!(flow.state(), VoteState::Voted(Vote::Approve));
    // One read before submitting, one poll
    assert_eq!(dao.proposal_reads(), 2);

    let submitted = dao.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].id, 4);
}

#[tokio::test]
async fn test_wait_for_vote_change_stops_at_change() {
    let dao = funded_dao();
    let snapshot = BTreeMap::new();
    let mut voted = dao.snapshot(4);
    voted.votes.insert(VOTER.to_string(), Vote::Approve);
    // Vote already visible: the first poll returns it
    dao.act_proposal(&ActProposalRequest::new(DAO, &voted, Vote::Approve.action()))
        .await
        .unwrap();

    let seen = wait_for_vote_change(
        &dao,
        DAO,
        4,
        VOTER,
        Vote::Approve,
        &snapshot,
        &fast_poll(),
        &CancelToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(seen.votes, voted.votes);
    assert_eq!(dao.proposal_reads(), 1);
}

#[tokio::test]
async fn test_insufficient_balance_keeps_state() {
    let dao = MockDao::new(vec![proposal(4, "Vote", ProposalStatus::InProgress)])
        .with_balance(VOTER, near("0.05"));
    let proposal = dao.snapshot(4);
    let check = BalanceCheck::fetch(&dao, VOTER, DAO, &proposal, near("0.3"))
        .await
        .unwrap();

    let mut flow = VoteFlow::new(DAO, proposal);
    let err = flow.request(Vote::Approve, &check).unwrap_err();
    assert!(err.is_insufficient_balance());
    assert_eq!(flow.state(), VoteState::NotVoted);

    // Nothing to confirm
    let err = flow
        .confirm(&dao, &dao, &fast_poll(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TreasuryError::InvalidVoteTransition(_)));
    assert!(dao.submitted().is_empty());
}

#[tokio::test]
async fn test_underfunded_treasury_blocks_only_approval() {
    let dao = MockDao::new(vec![proposal(3, "Transfer", ProposalStatus::InProgress)])
        .with_balance(VOTER, near("2"))
        .with_balance(DAO, near("0.5"));
    let proposal = dao.snapshot(3);
    let check = BalanceCheck::fetch(&dao, VOTER, DAO, &proposal, near("0.3"))
        .await
        .unwrap();
    assert_eq!(check.treasury, Some(near("0.5")));
    assert_eq!(check.transfer_amount, Some(near("1")));

    let mut flow = VoteFlow::new(DAO, proposal);
    assert!(flow.request(Vote::Approve, &check).unwrap_err().is_insufficient_balance());
    assert_eq!(flow.request(Vote::Reject, &check).unwrap(), VoteState::PendingConfirmation(Vote::Reject));
}

#[tokio::test]
async fn test_underfunded_treasury_blocks_any_vote() {
    let dao = MockDao::new(vec![proposal(4, "Vote", ProposalStatus::InProgress)])
        .with_balance(VOTER, near("2"))
        .with_balance(DAO, near("0.05"));
    let proposal = dao.snapshot(4);
    let check = BalanceCheck::fetch(&dao, VOTER, DAO, &proposal, near("0.3"))
        .await
        .unwrap();
    assert_eq!(check.transfer_amount, None);

    let mut flow = VoteFlow::new(DAO, proposal);
    let err = flow.request(Vote::Approve, &check).unwrap_err();
    assert!(err.is_insufficient_balance());
    assert_eq!(flow.state(), VoteState::NotVoted);
}

#[tokio::test]
async fn test_poll_gives_up_after_max_attempts() {
    let dao = funded_dao().silent();
    let mut flow = requested_flow(&dao, 4, Vote::Reject).await;

    let poll = PollConfig::default()
        .with_interval(Duration::from_millis(10))
        .with_max_attempts(3)
        .with_timeout(Duration::from_secs(5));
    let err = flow.confirm(&dao, &dao, &poll, &CancelToken::new()).await.unwrap_err();

    match err {
        TreasuryError::VoteTimeout(timeout) => assert_eq!(timeout.attempts, Some(3)),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(flow.state(), VoteState::NotVoted);
    assert_eq!(dao.proposal_reads(), 1 + 3);
    assert_eq!(dao.submitted().len(), 1);
}

#[tokio::test]
async fn test_poll_respects_deadline() {
    let dao = funded_dao().silent();
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;

    let poll = PollConfig::default()
        .with_interval(Duration::from_millis(10))
        .with_max_attempts(10_000)
        .with_timeout(Duration::from_millis(80));
    let started = std::time::Instant::now();
    let err = flow.confirm(&dao, &dao, &poll, &CancelToken::new()).await.unwrap_err();

    assert!(matches!(err, TreasuryError::VoteTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(flow.state(), VoteState::NotVoted);
}

#[tokio::test]
async fn test_cancel_stops_poll() {
    let dao = Arc::new(funded_dao().silent());
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;

    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        canceller.cancel();
    });

    let poll = PollConfig::default()
        .with_interval(Duration::from_millis(20))
        .with_max_attempts(1_000)
        .with_timeout(Duration::from_secs(30));
    let err = flow.confirm(dao.as_ref(), dao.as_ref(), &poll, &cancel).await.unwrap_err();

    assert!(matches!(err, TreasuryError::VoteCancelled(_)));
    assert!(cancel.is_cancelled());
    assert_eq!(flow.state(), VoteState::NotVoted);
}

#[tokio::test]
async fn test_confirmed_vote_is_published() {
    let dao = funded_dao();
    let bus = RefreshBus::new();
    let mut events = bus.subscribe();

    let mut flow = requested_flow(&dao, 4, Vote::Approve).await.with_bus(bus);
    flow.confirm(&dao, &dao, &fast_poll(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(
        events.recv().await.unwrap(),
        DashboardEvent::VoteRecorded {
            proposal_id: 4,
            vote: Vote::Approve
        }
    );
    assert_eq!(
        events.recv().await.unwrap(),
        DashboardEvent::RefreshProposals { category: None }
    );

    // A second vote on the same flow is refused
    let check = BalanceCheck::new(near("2"), near("0.3"));
    assert!(flow.request(Vote::Reject, &check).is_err());
}

// ============================================================================
// Votes from other approvers
// ============================================================================

#[tokio::test]
async fn test_foreign_vote_on_stale_snapshot_is_ignored() {
    let dao = funded_dao().silent();
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;
    // Cast after the flow captured its copy of the proposal
    dao.cast(4, "bob.near", Vote::Reject);

    let err = flow
        .confirm(&dao, &dao, &fast_poll(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TreasuryError::VoteTimeout(_)));
    assert_eq!(flow.state(), VoteState::NotVoted);
    assert_eq!(flow.proposal().vote_of(VOTER), None);
}

#[tokio::test]
async fn test_foreign_vote_during_poll_is_ignored() {
    let dao = Arc::new(funded_dao().silent());
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;

    let chain = dao.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        chain.cast(4, "bob.near", Vote::Reject);
    });

    let poll = PollConfig::default()
        .with_interval(Duration::from_millis(20))
        .with_max_attempts(6)
        .with_timeout(Duration::from_secs(2));
    let err = flow
        .confirm(dao.as_ref(), dao.as_ref(), &poll, &CancelToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TreasuryError::VoteTimeout(_)));
    assert_eq!(flow.state(), VoteState::NotVoted);
    assert_eq!(dao.snapshot(4).vote_of("bob.near"), Some(Vote::Reject));
}

#[tokio::test]
async fn test_own_vote_lands_next_to_foreign_vote() {
    let dao = funded_dao();
    let mut flow = requested_flow(&dao, 4, Vote::Approve).await;
    dao.cast(4, "bob.near", Vote::Reject);

    let updated = flow
        .confirm(&dao, &dao, &fast_poll(), &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(updated.vote_of(VOTER), Some(Vote::Approve));
    assert_eq!(updated.vote_of("bob.near"), Some(Vote::Reject));
    assert_eq!(flow.state(), VoteState::Voted(Vote::Approve));
}

#[tokio::test]
async fn test_cancel_interrupts_slow_read() {
    let dao = funded_dao().silent().with_read_delay(Duration::from_secs(10));
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let poll = PollConfig::default()
        .with_interval(Duration::from_millis(10))
        .with_max_attempts(5)
        .with_timeout(Duration::from_secs(30));
    let started = std::time::Instant::now();
    let err = wait_for_vote_change(&dao, DAO, 4, VOTER, Vote::Approve, &BTreeMap::new(), &poll, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, TreasuryError::VoteCancelled(_)));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(dao.proposal_reads(), 1);
}
