use super::proposal::{Proposal, ProposalKind};
use crate::utils::description::decode_field;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Proposal kinds managed from the settings pages
const SETTINGS_KINDS: &[&str] = &[
    "ChangePolicy",
    "ChangeConfig",
    "ChangePolicyAddOrUpdateRole",
    "ChangePolicyRemoveRole",
    "ChangePolicyUpdateDefaultVotePolicy",
    "ChangePolicyUpdateParameters",
    "AddMemberToRole",
    "RemoveMemberFromRole",
];

const STAKE_ACTIONS: &[&str] = &["stake", "unstake", "withdraw"];

/// The dashboard's request categories, one per list page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalCategory {
    Payments,
    StakeDelegation,
    AssetExchange,
    Lockup,
    Settings,
}

impl ProposalCategory {
    pub const ALL: [ProposalCategory; 5] = [
        ProposalCategory::Payments,
        ProposalCategory::StakeDelegation,
        ProposalCategory::AssetExchange,
        ProposalCategory::Lockup,
        ProposalCategory::Settings,
    ];

    /// Category name understood by the indexer
    pub fn slug(&self) -> &'static str {
        match self {
            ProposalCategory::Payments => "payments",
            ProposalCategory::StakeDelegation => "stake-delegation",
            ProposalCategory::AssetExchange => "asset-exchange",
            ProposalCategory::Lockup => "lockup",
            ProposalCategory::Settings => "settings",
        }
    }

    /// Policy label whose voters approve this category
    pub fn permission_label(&self) -> &'static str {
        match self {
            ProposalCategory::Payments => "transfer",
            ProposalCategory::StakeDelegation
            | ProposalCategory::AssetExchange
            | ProposalCategory::Lockup => "call",
            ProposalCategory::Settings => "policy",
        }
    }

    /// Contract kinds that can belong to this category
    pub fn kinds(&self) -> Vec<String> {
        let kinds: &[&str] = match self {
            ProposalCategory::Payments => &["Transfer", "FunctionCall"],
            ProposalCategory::StakeDelegation
            | ProposalCategory::AssetExchange
            | ProposalCategory::Lockup => &["FunctionCall"],
            ProposalCategory::Settings => SETTINGS_KINDS,
        };
        kinds.iter().map(|k| k.to_string()).collect()
    }

    /// Whether `proposal` is shown on this category's page.
    ///
    /// Several categories are all `FunctionCall`s; they are told apart by the
    /// `proposal_action` description field and the call target.
    pub fn matches(&self, proposal: &Proposal) -> bool {
        let kind = &proposal.kind;
        if !self.kinds().iter().any(|k| *k == kind.name) {
            return false;
        }
        let action = decode_field(&proposal.description, "proposal_action");
        let action = action.as_deref().map(str::to_lowercase);
        match self {
            ProposalCategory::Payments => {
                kind.name == "Transfer"
                    || (action.is_none() && call_methods(kind).any(|m| m == "ft_transfer" || m == "transfer"))
            }
            ProposalCategory::StakeDelegation => {
                action.as_deref().is_some_and(|a| STAKE_ACTIONS.contains(&a))
                    || proposal.description.contains("isStakeRequest")
            }
            ProposalCategory::AssetExchange => action.as_deref() == Some("asset-exchange"),
            ProposalCategory::Lockup => {
                action.as_deref() == Some("create-lockup")
                    || call_receiver(kind).is_some_and(|r| r == "lockup.near" || r.ends_with(".lockup.near"))
            }
            ProposalCategory::Settings => true,
        }
    }
}

fn call_receiver(kind: &ProposalKind) -> Option<&str> {
    kind.field("receiver_id").and_then(|v| v.as_str())
}

fn call_methods(kind: &ProposalKind) -> impl Iterator<Item = &str> {
    kind.field("actions")
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|action| action.get("method_name").and_then(|m| m.as_str()))
}

impl fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProposalCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ProposalCategory::ALL
            .iter()
            .find(|c| c.slug() == wanted)
            .copied()
            .ok_or_else(|| {
                format!(
                    "Unknown category '{}'. Valid options: payments, stake-delegation, asset-exchange, lockup, settings",
                    s
                )
            })
    }
}
