//! In-memory DAO shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use sputnik_treasury::errors::{ContractViewError, ProposalNotFound, TreasuryResult};
use sputnik_treasury::{
    ActProposalRequest, Action, DaoContract, FtMetadata, NearToken, Policy, Proposal,
    ProposalActor, ProposalStatus, Role, RoleKind, Threshold, Vote, VotePolicy, WeightKind,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const DAO: &str = "treasury.sputnik-dao.near";
pub const VOTER: &str = "alice.near";

/// Proposal of `kind` (`"Transfer"`, `"FunctionCall"`, `"Vote"`, ...)
pub fn proposal(id: u64, kind: &str, status: ProposalStatus) -> Proposal {
    let kind = match kind {
        "Transfer" => json!({"Transfer": {"token_id": "", "receiver_id": "bob.near", "amount": "1000000000000000000000000"}}),
        "FunctionCall" => json!({"FunctionCall": {"receiver_id": "usdc.near", "actions": [{"method_name": "ft_transfer", "args": "", "deposit": "1", "gas": "30000000000000"}]}}),
        unit => json!(unit),
    };
    serde_json::from_value(json!({
        "id": id,
        "proposer": "carol.near",
        "description": format!("* Title: Proposal {}", id),
        "kind": kind,
        "status": status,
        "submission_time": "1700000000000000000",
    }))
    .expect("valid proposal json")
}

pub fn role(name: &str, members: &[&str], permissions: &[&str]) -> Role {
    Role {
        name: name.to_string(),
        kind: RoleKind::Group(members.iter().map(|m| m.to_string()).collect()),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        vote_policy: BTreeMap::new(),
    }
}

pub fn policy(roles: Vec<Role>) -> Policy {
    Policy {
        roles,
        default_vote_policy: VotePolicy {
            weight_kind: WeightKind::RoleWeight,
            quorum: "0".to_string(),
            threshold: Threshold::Ratio(1, 2),
        },
        proposal_bond: "100000000000000000000000".to_string(),
        proposal_period: 0,
        bounty_bond: "0".to_string(),
        bounty_forgiveness_period: 0,
    }
}

pub fn near(amount: &str) -> NearToken {
    amount.parse().expect("valid NEAR amount")
}

/// DAO contract and signer backed by a map of proposals
pub struct MockDao {
    proposals: Mutex<BTreeMap<u64, Proposal>>,
    policy: Policy,
    balances: HashMap<String, NearToken>,
    voter: String,
    /// Whether submitted votes become visible to reads
    land_votes: bool,
    /// Latency of each `get_proposal` read
    read_delay: Option<Duration>,
    proposal_reads: AtomicUsize,
    batch_reads: AtomicUsize,
    submitted: Mutex<Vec<ActProposalRequest>>,
}

impl MockDao {
    pub fn new(proposals: Vec<Proposal>) -> Self {
        Self {
            proposals: Mutex::new(proposals.into_iter().map(|p| (p.id, p)).collect()),
            policy: policy(vec![role("council", &[VOTER, "bob.near"], &["*:*"])]),
            balances: HashMap::new(),
            voter: VOTER.to_string(),
            land_votes: true,
            read_delay: None,
            proposal_reads: AtomicUsize::new(0),
            batch_reads: AtomicUsize::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// `count` proposals with ids `0..count`, cycling through kinds
    pub fn with_generated(count: u64) -> Self {
        let kinds = ["Transfer", "FunctionCall", "Vote", "ChangePolicy"];
        let statuses = [
            ProposalStatus::InProgress,
            ProposalStatus::Approved,
            ProposalStatus::Rejected,
        ];
        Self::new(
            (0..count)
                .map(|id| proposal(id, kinds[id as usize % 4], statuses[id as usize % 3]))
                .collect(),
        )
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_balance(mut self, account: &str, amount: NearToken) -> Self {
        self.balances.insert(account.to_string(), amount);
        self
    }

    /// Votes are accepted but never show up on chain
    pub fn silent(mut self) -> Self {
        self.land_votes = false;
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Record `account`'s vote on chain as if another signer had cast it
    pub fn cast(&self, id: u64, account: &str, vote: Vote) {
        if let Some(proposal) = self.proposals.lock().unwrap().get_mut(&id) {
            proposal.votes.insert(account.to_string(), vote);
        }
    }

    pub fn proposal_reads(&self) -> usize {
        self.proposal_reads.load(Ordering::SeqCst)
    }

    pub fn batch_reads(&self) -> usize {
        self.batch_reads.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<ActProposalRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn snapshot(&self, id: u64) -> Proposal {
        self.proposals.lock().unwrap()[&id].clone()
    }
}

#[async_trait]
impl DaoContract for MockDao {
    async fn get_policy(&self, _dao_id: &str) -> TreasuryResult<Policy> {
        Ok(self.policy.clone())
    }

    async fn get_last_proposal_id(&self, _dao_id: &str) -> TreasuryResult<u64> {
        let proposals = self.proposals.lock().unwrap();
        Ok(proposals.keys().next_back().map_or(0, |id| id + 1))
    }

    async fn get_proposal(&self, dao_id: &str, id: u64) -> TreasuryResult<Proposal> {
        self.proposal_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.proposals
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| ProposalNotFound::with_id(dao_id, id).into())
    }

    async fn get_proposals(
        &self,
        _dao_id: &str,
        from_index: u64,
        limit: u64,
    ) -> TreasuryResult<Vec<Proposal>> {
        self.batch_reads.fetch_add(1, Ordering::SeqCst);
        let proposals = self.proposals.lock().unwrap();
        Ok(proposals
            .range(from_index..from_index.saturating_add(limit))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn ft_metadata(&self, token_id: &str) -> TreasuryResult<FtMetadata> {
        match token_id {
            "" | "near" => Ok(FtMetadata::native_near()),
            other => Err(ContractViewError::with_method("unknown token", other, "ft_metadata").into()),
        }
    }

    async fn account_balance(&self, account_id: &str) -> TreasuryResult<NearToken> {
        Ok(self.balances.get(account_id).copied().unwrap_or(NearToken::ZERO))
    }
}

#[async_trait]
impl ProposalActor for MockDao {
    fn account_id(&self) -> &str {
        &self.voter
    }

    async fn act_proposal(&self, request: &ActProposalRequest) -> TreasuryResult<()> {
        self.submitted.lock().unwrap().push(request.clone());
        if self.land_votes {
            let vote = match request.action {
                Action::VoteApprove => Vote::Approve,
                Action::VoteReject => Vote::Reject,
                _ => Vote::Remove,
            };
            if let Some(proposal) = self.proposals.lock().unwrap().get_mut(&request.id) {
                proposal.votes.insert(self.voter.clone(), vote);
            }
        }
        Ok(())
    }
}
