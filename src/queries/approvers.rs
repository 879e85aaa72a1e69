//! Who may vote on a proposal category, and how many votes pass it

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{AccountId, Policy, ProposalCategory, ProposalKind, RoleKind, Threshold, WeightKind};

/// Which voting right is being looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproverPurpose {
    /// Approve, reject or remove
    #[default]
    Vote,
    /// Only removal
    Remove,
}

impl ApproverPurpose {
    fn actions(&self) -> &'static [&'static str] {
        match self {
            ApproverPurpose::Vote => &["VoteApprove", "VoteReject", "VoteRemove"],
            ApproverPurpose::Remove => &["VoteRemove"],
        }
    }
}

/// Accounts entitled to vote on a category and the votes needed to pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApproverGroup {
    /// Group members in first-seen role order, without duplicates
    pub approver_accounts: Vec<AccountId>,
    pub required_votes: u64,
    /// An `Everyone` role holds the permission
    pub everyone_has_access: bool,
}

impl ApproverGroup {
    pub fn contains(&self, account: &str) -> bool {
        self.approver_accounts.iter().any(|a| a == account)
    }

    pub fn len(&self) -> usize {
        self.approver_accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approver_accounts.is_empty()
    }
}

/// Compute the approver group for a permission label such as `transfer`.
///
/// A role matches when one of its permissions grants `label:*` or one of the
/// purpose's vote actions; `*:` prefixes match every label. Only role-weight
/// thresholds count. A fixed weight wins over ratios; ratios of all
/// matching roles are summed and applied to the approver count.
pub fn approvers_and_threshold(
    policy: Option<&Policy>,
    label: &str,
    purpose: ApproverPurpose,
) -> ApproverGroup {
    let Some(policy) = policy else {
        return ApproverGroup::default();
    };

    let mut seen = HashSet::new();
    let mut approver_accounts = Vec::new();
    let mut everyone_has_access = false;
    let mut fixed_weight: Option<u128> = None;
    let (mut numerator, mut denominator) = (0u128, 0u128);

    for role in policy
        .roles
        .iter()
        .filter(|role| role.grants_any(label, purpose.actions()))
    {
        match &role.kind {
            RoleKind::Group(members) => {
                for member in members {
                    if seen.insert(member.as_str()) {
                        approver_accounts.push(member.clone());
                    }
                }
            }
            RoleKind::Everyone => everyone_has_access = true,
            RoleKind::Member(_) => {}
        }

        let vote_policy = role.vote_policy_for(label, &policy.default_vote_policy);
        if vote_policy.weight_kind != WeightKind::RoleWeight {
            continue;
        }
        match vote_policy.threshold {
            Threshold::Weight(weight) => {
                fixed_weight = Some(fixed_weight.map_or(weight, |w| w.max(weight)));
            }
            Threshold::Ratio(num, den) => {
                numerator += num as u128;
                denominator += den as u128;
            }
        }
    }

    let approvers = approver_accounts.len() as u128;
    let required_votes = match fixed_weight {
        Some(weight) => weight,
        None => ratio_threshold(numerator, denominator, approvers),
    };

    ApproverGroup {
        approver_accounts,
        required_votes: u64::try_from(required_votes).unwrap_or(u64::MAX),
        everyone_has_access,
    }
}

/// `min(floor(num * n / den) + 1, n)`, or zero when nothing is configured
fn ratio_threshold(numerator: u128, denominator: u128, approvers: u128) -> u128 {
    if denominator == 0 || approvers == 0 {
        return 0;
    }
    (numerator.saturating_mul(approvers) / denominator + 1).min(approvers)
}

/// Approver group for one of the dashboard categories
pub fn category_approvers(
    policy: Option<&Policy>,
    category: ProposalCategory,
    purpose: ApproverPurpose,
) -> ApproverGroup {
    approvers_and_threshold(policy, category.permission_label(), purpose)
}

/// Votes needed to pass a proposal of `kind`
pub fn required_votes_for(policy: Option<&Policy>, kind: &ProposalKind) -> u64 {
    approvers_and_threshold(policy, &kind.permission_label(), ApproverPurpose::Vote).required_votes
}
