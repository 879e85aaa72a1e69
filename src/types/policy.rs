use super::proposal::{u64_string, AccountId};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Membership rule of a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleKind {
    /// Anyone may act; no enumerable members
    Everyone,
    /// Accounts holding at least this token balance (decimal string)
    Member(String),
    /// An explicit list of member accounts
    Group(Vec<AccountId>),
}

impl RoleKind {
    /// Enumerable members; empty for non-Group kinds
    pub fn members(&self) -> &[AccountId] {
        match self {
            RoleKind::Group(members) => members,
            _ => &[],
        }
    }
}

/// How votes are weighted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightKind {
    TokenWeight,
    RoleWeight,
}

/// Either a fixed number of votes or a ratio of the role size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Threshold {
    /// `[numerator, denominator]`
    Ratio(u64, u64),
    /// Absolute weight, serialized as a decimal string
    Weight(#[serde(with = "u128_string")] u128),
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Array(parts) if parts.len() == 2 => {
                let num = parts[0].as_u64().ok_or_else(|| D::Error::custom("bad ratio numerator"))?;
                let den = parts[1].as_u64().ok_or_else(|| D::Error::custom("bad ratio denominator"))?;
                Ok(Threshold::Ratio(num, den))
            }
            serde_json::Value::String(s) => s
                .parse()
                .map(Threshold::Weight)
                .map_err(|_| D::Error::custom(format!("bad weight threshold '{}'", s))),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(|w| Threshold::Weight(w as u128))
                .ok_or_else(|| D::Error::custom("bad weight threshold")),
            other => Err(D::Error::custom(format!("unexpected threshold {}", other))),
        }
    }
}

mod u128_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }
}

/// Vote policy for a proposal kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePolicy {
    pub weight_kind: WeightKind,
    /// Minimum number of votes regardless of threshold (decimal string)
    #[serde(default)]
    pub quorum: String,
    pub threshold: Threshold,
}

impl Default for VotePolicy {
    fn default() -> Self {
        Self {
            weight_kind: WeightKind::RoleWeight,
            quorum: "0".to_string(),
            threshold: Threshold::Ratio(1, 2),
        }
    }
}

/// A named role with its permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub kind: RoleKind,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Per-kind overrides keyed by permission label
    #[serde(default)]
    pub vote_policy: BTreeMap<String, VotePolicy>,
}

impl Role {
    /// True if any permission grants one of `actions` on `label`.
    ///
    /// Wildcards follow the contract's rules: `label:*`, `*:action` and
    /// `*:*` all match.
    pub fn grants_any(&self, label: &str, actions: &[&str]) -> bool {
        self.permissions.iter().any(|permission| {
            let Some((perm_label, perm_action)) = permission.split_once(':') else {
                return false;
            };
            let label_ok = perm_label == "*" || perm_label == label;
            let action_ok = perm_action == "*" || actions.contains(&perm_action);
            label_ok && action_ok
        })
    }

    /// Vote policy applying to `label`, falling back to the DAO default
    pub fn vote_policy_for<'a>(&'a self, label: &str, default: &'a VotePolicy) -> &'a VotePolicy {
        self.vote_policy.get(label).unwrap_or(default)
    }
}

/// DAO-wide role, permission and threshold configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub default_vote_policy: VotePolicy,
    #[serde(default)]
    pub proposal_bond: String,
    /// Voting period in nanoseconds
    #[serde(with = "u64_string", default)]
    pub proposal_period: u64,
    #[serde(default)]
    pub bounty_bond: String,
    #[serde(with = "u64_string", default)]
    pub bounty_forgiveness_period: u64,
}

impl Policy {
    /// Union of all Group members, in role order
    pub fn all_group_members(&self) -> Vec<&AccountId> {
        self.roles
            .iter()
            .flat_map(|role| role.kind.members().iter())
            .collect()
    }

    /// Voting period, or `None` when the contract reports zero
    pub fn proposal_period_ns(&self) -> Option<u64> {
        (self.proposal_period > 0).then_some(self.proposal_period)
    }
}
