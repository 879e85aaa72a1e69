//! Approver group and threshold computation over DAO policies.

mod common;

use common::{policy, role};
use proptest::prelude::*;
use sputnik_treasury::{
    approvers_and_threshold, category_approvers, required_votes_for, ApproverPurpose,
    ProposalCategory, ProposalKind, Role, RoleKind, Threshold, VotePolicy, WeightKind,
};

#[test]
fn test_council_majority() {
    let policy = policy(vec![
        role("council", &["a.near", "b.near", "c.near"], &["transfer:*", "call:VoteApprove"]),
        role("requestors", &["d.near"], &["transfer:AddProposal"]),
    ]);
    let group = approvers_and_threshold(Some(&policy), "transfer", ApproverPurpose::Vote);
    assert_eq!(group.approver_accounts, vec!["a.near", "b.near", "c.near"]);
    // floor(1 * 3 / 2) + 1
    assert_eq!(group.required_votes, 2);
    assert!(!group.contains("d.near"));
}

#[test]
fn test_overlapping_roles_deduplicated_in_order() {
    let policy = policy(vec![
        role("admins", &["b.near", "a.near"], &["*:*"]),
        role("council", &["a.near", "c.near"], &["transfer:VoteReject"]),
    ]);
    let group = approvers_and_threshold(Some(&policy), "transfer", ApproverPurpose::Vote);
    assert_eq!(group.approver_accounts, vec!["b.near", "a.near", "c.near"]);
    // Ratios of both roles are summed: floor(2 * 3 / 4) + 1
    assert_eq!(group.required_votes, 2);
}

#[test]
fn test_remove_purpose_needs_remove_right() {
    let policy = policy(vec![
        role("voters", &["a.near"], &["transfer:VoteApprove", "transfer:VoteReject"]),
        role("cleaners", &["b.near"], &["transfer:VoteRemove"]),
    ]);
    let group = approvers_and_threshold(Some(&policy), "transfer", ApproverPurpose::Remove);
    assert_eq!(group.approver_accounts, vec!["b.near"]);
}

#[test]
fn test_fixed_weight_wins() {
    let mut council = role("council", &["a.near", "b.near", "c.near", "d.near"], &["transfer:*"]);
    council.vote_policy.insert(
        "transfer".to_string(),
        VotePolicy {
            weight_kind: WeightKind::RoleWeight,
            quorum: "0".to_string(),
            threshold: Threshold::Weight(3),
        },
    );
    let policy = policy(vec![council, role("ops", &["e.near"], &["transfer:*"])]);
    let group = approvers_and_threshold(Some(&policy), "transfer", ApproverPurpose::Vote);
    assert_eq!(group.len(), 5);
    assert_eq!(group.required_votes, 3);
}

#[test]
fn test_token_weight_ignored() {
    let mut policy = policy(vec![role("council", &["a.near", "b.near"], &["transfer:*"])]);
    policy.default_vote_policy.weight_kind = WeightKind::TokenWeight;
    let group = approvers_and_threshold(Some(&policy), "transfer", ApproverPurpose::Vote);
    assert_eq!(group.len(), 2);
    assert_eq!(group.required_votes, 0);
}

#[test]
fn test_everyone_role() {
    let policy = policy(vec![Role {
        name: "all".to_string(),
        kind: RoleKind::Everyone,
        permissions: vec!["policy:VoteApprove".to_string()],
        vote_policy: Default::default(),
    }]);
    let group = category_approvers(Some(&policy), ProposalCategory::Settings, ApproverPurpose::Vote);
    assert!(group.everyone_has_access);
    assert!(group.is_empty());
    assert_eq!(group.required_votes, 0);
}

#[test]
fn test_no_policy() {
    let group = approvers_and_threshold(None, "transfer", ApproverPurpose::Vote);
    assert!(group.is_empty());
    assert_eq!(group.required_votes, 0);
}

#[test]
fn test_required_votes_for_kind() {
    let policy = policy(vec![role("council", &["a.near", "b.near", "c.near", "d.near"], &["call:*"])]);
    let call = ProposalKind::new("FunctionCall");
    assert_eq!(required_votes_for(Some(&policy), &call), 3);
    assert_eq!(required_votes_for(Some(&policy), &ProposalKind::new("Transfer")), 0);
}

// ============================================================================
// Properties
// ============================================================================

const ACCOUNTS: [&str; 6] = ["a.near", "b.near", "c.near", "d.near", "e.near", "f.near"];
const PERMISSIONS: [&str; 6] = [
    "transfer:*",
    "transfer:VoteApprove",
    "transfer:VoteRemove",
    "call:*",
    "*:VoteReject",
    "*:*",
];

fn arb_role() -> impl Strategy<Value = Role> {
    (
        proptest::collection::vec(0usize..ACCOUNTS.len(), 0..5),
        proptest::collection::vec(0usize..PERMISSIONS.len(), 0..3),
        (1u64..4, 1u64..5),
    )
        .prop_map(|(members, permissions, (num, den))| {
            let members: Vec<&str> = members.into_iter().map(|i| ACCOUNTS[i]).collect();
            let permissions: Vec<&str> = permissions.into_iter().map(|i| PERMISSIONS[i]).collect();
            let mut role = role("generated", &members, &permissions);
            role.vote_policy.insert(
                "transfer".to_string(),
                VotePolicy {
                    weight_kind: WeightKind::RoleWeight,
                    quorum: "0".to_string(),
                    threshold: Threshold::Ratio(num, den),
                },
            );
            role
        })
}

proptest! {
    #[test]
    fn prop_group_is_unique_subset(
        roles in proptest::collection::vec(arb_role(), 0..5),
        remove in any::<bool>(),
    ) {
        let policy = policy(roles);
        let purpose = if remove { ApproverPurpose::Remove } else { ApproverPurpose::Vote };
        let group = approvers_and_threshold(Some(&policy), "transfer", purpose);

        let mut deduped = group.approver_accounts.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), group.approver_accounts.len());

        let members = policy.all_group_members();
        for account in &group.approver_accounts {
            prop_assert!(members.contains(&account));
        }
        prop_assert!(group.required_votes as usize <= group.len());
    }
}
