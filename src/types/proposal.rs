use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// NEAR account id as returned by the contract
pub type AccountId = String;

/// Whether `account_id` follows NEAR account naming rules: 2 to 64
/// characters, lowercase alphanumeric parts joined by `.`, `-` or `_`.
pub fn is_valid_account_id(account_id: &str) -> bool {
    if !(2..=64).contains(&account_id.len()) {
        return false;
    }
    let mut last_was_separator = true;
    for c in account_id.chars() {
        match c {
            'a'..='z' | '0'..='9' => last_was_separator = false,
            '.' | '-' | '_' if !last_was_separator => last_was_separator = true,
            _ => return false,
        }
    }
    !last_was_separator
}

/// Lifecycle status of a Sputnik proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalStatus {
    InProgress,
    Approved,
    Rejected,
    Removed,
    Expired,
    Moved,
    Failed,
}

impl ProposalStatus {
    pub const ALL: [ProposalStatus; 7] = [
        ProposalStatus::InProgress,
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Removed,
        ProposalStatus::Expired,
        ProposalStatus::Moved,
        ProposalStatus::Failed,
    ];

    /// Statuses shown on the "pending requests" tables
    pub const PENDING: [ProposalStatus; 1] = [ProposalStatus::InProgress];

    /// Statuses shown on the "history" tables
    pub const HISTORY: [ProposalStatus; 4] = [
        ProposalStatus::Approved,
        ProposalStatus::Rejected,
        ProposalStatus::Expired,
        ProposalStatus::Failed,
    ];

    /// Finalized proposals never change again
    pub fn is_final(&self) -> bool {
        !matches!(self, ProposalStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::InProgress => "InProgress",
            ProposalStatus::Approved => "Approved",
            ProposalStatus::Rejected => "Rejected",
            ProposalStatus::Removed => "Removed",
            ProposalStatus::Expired => "Expired",
            ProposalStatus::Moved => "Moved",
            ProposalStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProposalStatus::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Unknown proposal status '{}'", s))
    }
}

/// A single recorded vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vote {
    Approve,
    Reject,
    Remove,
}

impl Vote {
    /// The `act_proposal` action that casts this vote
    pub fn action(&self) -> Action {
        match self {
            Vote::Approve => Action::VoteApprove,
            Vote::Reject => Action::VoteReject,
            Vote::Remove => Action::VoteRemove,
        }
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Approve => f.write_str("Approve"),
            Vote::Reject => f.write_str("Reject"),
            Vote::Remove => f.write_str("Remove"),
        }
    }
}

impl FromStr for Vote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approve" => Ok(Vote::Approve),
            "reject" => Ok(Vote::Reject),
            "remove" | "delete" => Ok(Vote::Remove),
            _ => Err(format!(
                "Invalid vote '{}'. Valid options: approve, reject, remove",
                s
            )),
        }
    }
}

/// Actions accepted by `act_proposal`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    AddProposal,
    RemoveProposal,
    VoteApprove,
    VoteReject,
    VoteRemove,
    Finalize,
    MoveToHub,
}

impl Action {
    /// Suffix used in policy permission strings (`transfer:VoteApprove`)
    pub fn permission_suffix(&self) -> &'static str {
        match self {
            Action::AddProposal => "AddProposal",
            Action::RemoveProposal => "RemoveProposal",
            Action::VoteApprove => "VoteApprove",
            Action::VoteReject => "VoteReject",
            Action::VoteRemove => "VoteRemove",
            Action::Finalize => "Finalize",
            Action::MoveToHub => "MoveToHub",
        }
    }
}

/// Proposal kind as stored by the contract.
///
/// The contract serializes kinds as an externally tagged enum: unit variants
/// as a bare string (`"Vote"`) and the rest as a single-key object
/// (`{"Transfer": {...}}`). Only the variant name matters for filtering, so
/// the payload is kept as raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalKind {
    pub name: String,
    pub payload: Option<serde_json::Value>,
}

impl ProposalKind {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload: Some(payload),
        }
    }

    /// Policy label for this kind (the part before `:` in permissions)
    pub fn permission_label(&self) -> String {
        match self.name.as_str() {
            "ChangeConfig" => "config".to_string(),
            "ChangePolicy" => "policy".to_string(),
            "AddMemberToRole" => "add_member_to_role".to_string(),
            "RemoveMemberFromRole" => "remove_member_from_role".to_string(),
            "FunctionCall" => "call".to_string(),
            "UpgradeSelf" => "upgrade_self".to_string(),
            "UpgradeRemote" => "upgrade_remote".to_string(),
            "Transfer" => "transfer".to_string(),
            "SetStakingContract" => "set_vote_token".to_string(),
            "AddBounty" => "add_bounty".to_string(),
            "BountyDone" => "bounty_done".to_string(),
            "Vote" => "vote".to_string(),
            "FactoryInfoUpdate" => "factory_info_update".to_string(),
            "ChangePolicyAddOrUpdateRole" => "policy_add_or_update_role".to_string(),
            "ChangePolicyRemoveRole" => "policy_remove_role".to_string(),
            "ChangePolicyUpdateDefaultVotePolicy" => {
                "policy_update_default_vote_policy".to_string()
            }
            "ChangePolicyUpdateParameters" => "policy_update_parameters".to_string(),
            other => to_snake_case(other),
        }
    }

    /// Field of the payload, if this kind carries one
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.as_ref().and_then(|p| p.get(key))
    }

    /// Token contract and raw amount of a `Transfer`; the token id is
    /// empty for native NEAR
    pub fn transfer(&self) -> Option<(&str, u128)> {
        if self.name != "Transfer" {
            return None;
        }
        let token = self.field("token_id").and_then(|v| v.as_str()).unwrap_or("");
        let amount = self
            .field("amount")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())?;
        Some((token, amount))
    }

    /// For a `Transfer` of native NEAR, the amount in yoctoNEAR
    pub fn native_transfer_amount(&self) -> Option<u128> {
        match self.transfer()? {
            ("", amount) => Some(amount),
            _ => None,
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl Serialize for ProposalKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.payload {
            None => serializer.serialize_str(&self.name),
            Some(payload) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(&self.name, payload)?;
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ProposalKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(name) => Ok(ProposalKind::new(name)),
            serde_json::Value::Object(map) if map.len() == 1 => {
                let (name, payload) = map.into_iter().next().ok_or_else(|| {
                    de::Error::custom("proposal kind object must have exactly one key")
                })?;
                Ok(ProposalKind::with_payload(name, payload))
            }
            other => Err(de::Error::custom(format!(
                "unexpected proposal kind: {}",
                other
            ))),
        }
    }
}

/// A Sputnik-DAO proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    #[serde(default)]
    pub proposer: AccountId,
    #[serde(default)]
    pub description: String,
    pub kind: ProposalKind,
    pub status: ProposalStatus,
    #[serde(default)]
    pub vote_counts: BTreeMap<String, [serde_json::Value; 3]>,
    #[serde(default)]
    pub votes: BTreeMap<AccountId, Vote>,
    /// Submission time in nanoseconds since the epoch
    #[serde(with = "u64_string", default)]
    pub submission_time: u64,
}

impl Proposal {
    /// Status as shown to users: an `InProgress` proposal whose voting
    /// period elapsed is reported as `Expired`.
    pub fn effective_status(&self, proposal_period_ns: Option<u64>, now_ns: u64) -> ProposalStatus {
        match (self.status, proposal_period_ns) {
            (ProposalStatus::InProgress, Some(period))
                if self.submission_time.saturating_add(period) <= now_ns =>
            {
                ProposalStatus::Expired
            }
            (status, _) => status,
        }
    }

    /// Vote cast by `account`, if any
    pub fn vote_of(&self, account: &str) -> Option<Vote> {
        self.votes.get(account).copied()
    }

    pub fn approvals(&self) -> usize {
        self.votes.values().filter(|v| **v == Vote::Approve).count()
    }

    pub fn rejections(&self) -> usize {
        self.votes.values().filter(|v| **v == Vote::Reject).count()
    }

    /// Submission time as a UTC timestamp
    pub fn submitted_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = (self.submission_time / 1_000_000_000) as i64;
        let nanos = (self.submission_time % 1_000_000_000) as u32;
        chrono::DateTime::from_timestamp(secs, nanos)
    }
}

/// (De)serialize a `u64` carried as a JSON string, also accepting numbers
pub(crate) mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s.parse().map_err(serde::de::Error::custom),
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| serde::de::Error::custom("expected unsigned integer")),
            serde_json::Value::Null => Ok(0),
            other => Err(serde::de::Error::custom(format!(
                "expected integer string, got {}",
                other
            ))),
        }
    }
}

/// Arguments for `act_proposal`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActProposalRequest {
    pub dao_id: AccountId,
    pub id: u64,
    pub action: Action,
    /// Kind of the proposal being acted on; newer contracts require it
    pub proposal: ProposalKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl ActProposalRequest {
    pub fn new(dao_id: impl Into<AccountId>, proposal: &Proposal, action: Action) -> Self {
        Self {
            dao_id: dao_id.into(),
            id: proposal.id,
            action,
            proposal: proposal.kind.clone(),
            memo: None,
        }
    }

    /// JSON arguments passed to the contract method
    pub fn args(&self) -> serde_json::Value {
        let mut args = serde_json::json!({
            "id": self.id,
            "action": self.action,
            "proposal": self.proposal,
        });
        if let Some(memo) = &self.memo {
            args["memo"] = serde_json::Value::String(memo.clone());
        }
        args
    }
}
