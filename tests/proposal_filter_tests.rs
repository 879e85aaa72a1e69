//! Cursor-paginated proposal filtering against an in-memory DAO.
//!
//! Covers:
//! 1. Kind and status filtering with exact totals
//! 2. Cursor monotonicity while paging forward and back
//! 3. Stale fetch results never overwrite newer ones
//! 4. Property tests over generated DAOs

mod common;

use common::{proposal, MockDao, DAO};
use proptest::prelude::*;
use sputnik_treasury::{
    filtered_proposals, PageCursor, ProposalCategory, ProposalPageRequest, ProposalPager,
    ProposalStatus,
};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
        .block_on(future)
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test]
async fn test_transfers_skip_other_kinds() {
    let dao = MockDao::new(vec![
        proposal(3, "Transfer", ProposalStatus::InProgress),
        proposal(4, "Vote", ProposalStatus::InProgress),
        proposal(5, "Transfer", ProposalStatus::InProgress),
    ]);
    let request = ProposalPageRequest::new(DAO)
        .with_page_size(10)
        .with_kinds(["Transfer"])
        .with_statuses([ProposalStatus::InProgress]);

    let page = filtered_proposals(&dao, &request).await.unwrap();
    assert_eq!(page.ids(), vec![5, 3]);
    assert_eq!(page.total_length, 2);
    assert_eq!(page.next_offset, None);
    assert_eq!(page.prev_offset, None);
    assert_eq!(page.last_proposal_id, 6);
}

#[tokio::test]
async fn test_history_of_transfers() {
    let dao = MockDao::new(vec![
        proposal(3, "Transfer", ProposalStatus::Rejected),
        proposal(4, "FunctionCall", ProposalStatus::InProgress),
        proposal(5, "Transfer", ProposalStatus::Approved),
    ]);
    let request = ProposalPageRequest::new(DAO)
        .with_page_size(10)
        .with_kinds(["Transfer"])
        .with_statuses([ProposalStatus::Approved, ProposalStatus::Rejected]);

    let page = filtered_proposals(&dao, &request).await.unwrap();
    assert_eq!(page.ids(), vec![5, 3]);
    assert_eq!(page.total_length, 2);
}

#[tokio::test]
async fn test_status_filter_and_offset() {
    let dao = MockDao::with_generated(12);
    let request = ProposalPageRequest::new(DAO)
        .with_page_size(2)
        .with_statuses([ProposalStatus::Approved])
        .with_offset(Some(PageCursor(10)));

    let page = filtered_proposals(&dao, &request).await.unwrap();
    // Approved ids are 1, 4, 7, 10; the cursor excludes 10
    assert_eq!(page.ids(), vec![7, 4]);
    assert_eq!(page.total_length, 4);
    assert_eq!(page.next_offset, Some(PageCursor(4)));
    assert_eq!(page.prev_offset, Some(PageCursor(12)));
}

#[tokio::test]
async fn test_page_number_without_offset() {
    let dao = MockDao::with_generated(20);
    let request = ProposalPageRequest::new(DAO)
        .with_page_size(5)
        .with_current_page(1);
    let page = filtered_proposals(&dao, &request).await.unwrap();
    assert_eq!(page.ids(), vec![14, 13, 12, 11, 10]);
    assert_eq!(page.total_length, 20);
}

#[tokio::test]
async fn test_scan_reads_in_batches() {
    let dao = MockDao::with_generated(95);
    let request = ProposalPageRequest::new(DAO).with_page_size(10);
    let page = filtered_proposals(&dao, &request).await.unwrap();
    assert_eq!(page.total_length, 95);
    // 95 ids in batches of 30
    assert_eq!(dao.batch_reads(), 4);
}

#[tokio::test]
async fn test_empty_dao() {
    let dao = MockDao::new(Vec::new());
    let page = filtered_proposals(&dao, &ProposalPageRequest::new(DAO)).await.unwrap();
    assert!(page.filtered_proposals.is_empty());
    assert_eq!(page.total_length, 0);
    assert_eq!(page.next_offset, None);
}

#[tokio::test]
async fn test_invalid_page_size() {
    let dao = MockDao::with_generated(3);
    let request = ProposalPageRequest::new(DAO).with_page_size(0);
    let err = filtered_proposals(&dao, &request).await.unwrap_err();
    assert_eq!(err.category(), "parameter");
}

#[tokio::test]
async fn test_category_predicate() {
    let dao = MockDao::with_generated(8);
    let request = ProposalPageRequest::new(DAO)
        .with_page_size(10)
        .for_category(ProposalCategory::Payments);
    let page = filtered_proposals(&dao, &request).await.unwrap();
    // Transfers (0, 4) and ft_transfer calls (1, 5)
    assert_eq!(page.ids(), vec![5, 4, 1, 0]);
}

// ============================================================================
// Pager
// ============================================================================

#[tokio::test]
async fn test_pager_cursors_are_monotonic() {
    let dao = MockDao::with_generated(47);
    let mut pager = ProposalPager::new(ProposalPageRequest::new(DAO).with_page_size(6));

    let mut forward = Vec::new();
    let mut seen = Vec::new();
    loop {
        let page = pager.fetch(&dao).await.unwrap().expect("fresh page");
        seen.extend(page.ids());
        if let Some(next) = page.next_offset {
            forward.push(next);
        }
        if !pager.next() {
            break;
        }
    }
    assert!(forward.windows(2).all(|w| w[0] >= w[1]), "{:?}", forward);
    assert_eq!(seen, (0..47).rev().collect::<Vec<_>>());

    let mut backward = Vec::new();
    while pager.prev() {
        let page = pager.fetch(&dao).await.unwrap().expect("fresh page");
        if let Some(prev) = page.prev_offset {
            backward.push(prev);
        }
    }
    assert!(backward.windows(2).all(|w| w[0] <= w[1]), "{:?}", backward);
    assert_eq!(pager.current_page(), 0);
    assert!(!pager.has_prev());
}

#[tokio::test]
async fn test_stale_fetch_is_dropped() {
    let dao = MockDao::with_generated(10);
    let mut pager = ProposalPager::new(ProposalPageRequest::new(DAO).with_page_size(3));

    let (stale_ticket, stale_request) = pager.begin_fetch();
    let (fresh_ticket, fresh_request) = pager.begin_fetch();

    let fresh = filtered_proposals(&dao, &fresh_request).await.unwrap();
    let stale = filtered_proposals(&dao, &stale_request).await.unwrap();

    assert!(pager.complete(fresh_ticket, fresh));
    assert!(!pager.complete(stale_ticket, stale));
    assert_eq!(pager.current().unwrap().ids(), vec![9, 8, 7]);
}

#[tokio::test]
async fn test_filter_change_resets_pager() {
    let dao = MockDao::with_generated(10);
    let mut pager = ProposalPager::new(ProposalPageRequest::new(DAO).with_page_size(3));
    pager.fetch(&dao).await.unwrap();
    assert!(pager.next());

    let (ticket, request) = pager.begin_fetch();
    pager.set_filter(vec!["Transfer".to_string()], Vec::new());
    let late = filtered_proposals(&dao, &request).await.unwrap();
    assert!(!pager.complete(ticket, late));
    assert_eq!(pager.current_page(), 0);

    let page = pager.fetch(&dao).await.unwrap().unwrap();
    assert_eq!(page.ids(), vec![8, 4, 0]);
}

// ============================================================================
// Properties
// ============================================================================

fn kind_name(index: usize) -> &'static str {
    ["Transfer", "FunctionCall", "Vote", "ChangePolicy"][index]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_results_stay_within_filters(
        count in 0u64..80,
        page_size in 1usize..12,
        kinds in proptest::collection::btree_set(0usize..4, 0..3),
        pending_only in any::<bool>(),
        cursor in proptest::option::of(0u64..90),
    ) {
        let dao = MockDao::with_generated(count);
        let kinds: Vec<&str> = kinds.into_iter().map(kind_name).collect();
        let statuses = if pending_only { vec![ProposalStatus::InProgress] } else { Vec::new() };
        let request = ProposalPageRequest::new(DAO)
            .with_page_size(page_size)
            .with_kinds(kinds.clone())
            .with_statuses(statuses.clone())
            .with_offset(cursor.map(PageCursor));

        let page = block_on(filtered_proposals(&dao, &request)).unwrap();

        prop_assert!(page.filtered_proposals.len() <= page_size);
        for p in &page.filtered_proposals {
            prop_assert!(kinds.is_empty() || kinds.contains(&p.kind.name.as_str()));
            prop_assert!(statuses.is_empty() || statuses.contains(&p.status));
            if let Some(c) = cursor {
                prop_assert!(p.id < c);
            }
        }
        let ids = page.ids();
        prop_assert!(ids.windows(2).all(|w| w[0] > w[1]));
        if let Some(next) = page.next_offset {
            prop_assert_eq!(Some(next.0), ids.last().copied());
        }

        let expected_total = (0..count)
            .filter(|id| kinds.is_empty() || kinds.contains(&kind_name(*id as usize % 4)))
            .filter(|id| !pending_only || id % 3 == 0)
            .count();
        prop_assert_eq!(page.total_length, expected_total);
    }
}
