//! Cursor-paginated proposal listing over the contract's id space
//!
//! The DAO contract only serves proposals by id, so kind/status filtering
//! happens here. A page is read by walking ids downward from the newest
//! proposal; every id is visited so that `total_length` is exact. This is
//! linear in the number of proposals, which is acceptable for DAOs with
//! hundreds of proposals and is the fallback when no indexer is available.
//!
//! A [`PageCursor`] is an exclusive upper bound on ids: the page for cursor
//! `c` holds the newest matching proposals with `id < c`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::contract::DaoContract;
use crate::core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PROPOSAL_BATCH_SIZE};
use crate::errors::{InvalidParameter, TreasuryResult};
use crate::types::{Proposal, ProposalCategory, ProposalStatus};

/// Exclusive upper-bound proposal id of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(pub u64);

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extra predicate applied after the kind and status filters
#[derive(Clone)]
pub struct DescriptionFilter(Arc<dyn Fn(&Proposal) -> bool + Send + Sync>);

impl DescriptionFilter {
    pub fn new(predicate: impl Fn(&Proposal) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }

    /// Keep only proposals shown on `category`'s page
    pub fn category(category: ProposalCategory) -> Self {
        Self::new(move |proposal| category.matches(proposal))
    }

    pub fn matches(&self, proposal: &Proposal) -> bool {
        (self.0)(proposal)
    }
}

impl fmt::Debug for DescriptionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DescriptionFilter(..)")
    }
}

/// Parameters of one page fetch
#[derive(Debug, Clone)]
pub struct ProposalPageRequest {
    pub dao_id: String,
    pub page_size: usize,
    /// Accepted kind names; empty accepts every kind
    pub kinds: Vec<String>,
    /// Accepted statuses; empty accepts every status
    pub statuses: Vec<ProposalStatus>,
    /// Cursor of the requested page; `None` starts at the newest proposal
    pub offset: Option<PageCursor>,
    /// Known proposal count, fetched from the contract when absent
    pub last_proposal_id: Option<u64>,
    /// Page number used when no `offset` is given
    pub current_page: usize,
    /// Voting period in nanoseconds, used to report elapsed proposals as expired
    pub proposal_period: Option<u64>,
    pub description_filter: Option<DescriptionFilter>,
    /// Clock override for expiry, nanoseconds since the epoch
    pub now_ns: Option<u64>,
}

impl ProposalPageRequest {
    pub fn new(dao_id: impl Into<String>) -> Self {
        Self {
            dao_id: dao_id.into(),
            page_size: DEFAULT_PAGE_SIZE,
            kinds: Vec::new(),
            statuses: Vec::new(),
            offset: None,
            last_proposal_id: None,
            current_page: 0,
            proposal_period: None,
            description_filter: None,
            now_ns: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ProposalStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_offset(mut self, offset: Option<PageCursor>) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_last_proposal_id(mut self, last_proposal_id: u64) -> Self {
        self.last_proposal_id = Some(last_proposal_id);
        self
    }

    pub fn with_current_page(mut self, current_page: usize) -> Self {
        self.current_page = current_page;
        self
    }

    pub fn with_proposal_period(mut self, period_ns: Option<u64>) -> Self {
        self.proposal_period = period_ns;
        self
    }

    pub fn with_description_filter(mut self, filter: DescriptionFilter) -> Self {
        self.description_filter = Some(filter);
        self
    }

    pub fn with_now(mut self, now_ns: u64) -> Self {
        self.now_ns = Some(now_ns);
        self
    }

    /// Kind filter and page predicate of a dashboard category
    pub fn for_category(self, category: ProposalCategory) -> Self {
        self.with_kinds(category.kinds())
            .with_description_filter(DescriptionFilter::category(category))
    }

    fn matches(&self, proposal: &Proposal, now_ns: u64) -> bool {
        if !self.kinds.is_empty() && !self.kinds.iter().any(|k| *k == proposal.kind.name) {
            return false;
        }
        let status = proposal.effective_status(self.proposal_period, now_ns);
        if !self.statuses.is_empty() && !self.statuses.contains(&status) {
            return false;
        }
        self.description_filter
            .as_ref()
            .map_or(true, |filter| filter.matches(proposal))
    }

    fn validate(&self) -> TreasuryResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(InvalidParameter::with_parameter(
                format!("page size must be between 1 and {}", MAX_PAGE_SIZE),
                "page_size",
            )
            .into());
        }
        Ok(())
    }
}

/// One page of filtered proposals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredProposals {
    /// Matches on this page, newest first
    pub filtered_proposals: Vec<Proposal>,
    /// Matches across the whole DAO
    pub total_length: usize,
    /// Cursor of the following (older) page, if any
    pub next_offset: Option<PageCursor>,
    /// Cursor of the preceding (newer) page, if any
    pub prev_offset: Option<PageCursor>,
    /// Proposal count the scan started from
    pub last_proposal_id: u64,
}

impl FilteredProposals {
    pub fn ids(&self) -> Vec<u64> {
        self.filtered_proposals.iter().map(|p| p.id).collect()
    }
}

/// Fetch one page of proposals matching `request`.
///
/// Contract errors propagate unchanged; transport retries happen below
/// this layer.
pub async fn filtered_proposals<C>(
    contract: &C,
    request: &ProposalPageRequest,
) -> TreasuryResult<FilteredProposals>
where
    C: DaoContract + ?Sized,
{
    request.validate()?;

    let last_proposal_id = match request.last_proposal_id {
        Some(last) => last,
        None => contract.get_last_proposal_id(&request.dao_id).await?,
    };
    let now_ns = request.now_ns.unwrap_or_else(now_nanos);

    let cursor = request
        .offset
        .map_or(last_proposal_id, |c| c.0.min(last_proposal_id));
    // Page-number addressing only applies without an explicit cursor
    let mut to_skip = if request.offset.is_none() {
        request.current_page.saturating_mul(request.page_size)
    } else {
        0
    };

    debug!(
        dao_id = %request.dao_id,
        last_proposal_id,
        cursor,
        page_size = request.page_size,
        "scanning proposals"
    );

    let mut page = Vec::with_capacity(request.page_size);
    let mut newer_matches: Vec<u64> = Vec::new();
    let mut older_matches = 0usize;
    let mut total_length = 0usize;
    let mut upper = last_proposal_id;

    while upper > 0 {
        let from_index = upper.saturating_sub(PROPOSAL_BATCH_SIZE);
        let mut batch = contract
            .get_proposals(&request.dao_id, from_index, upper - from_index)
            .await?;
        trace!(from_index, upper, fetched = batch.len(), "proposal batch");
        batch.sort_by(|a, b| b.id.cmp(&a.id));

        for proposal in batch {
            if proposal.id >= upper || proposal.id < from_index {
                continue;
            }
            if !request.matches(&proposal, now_ns) {
                continue;
            }
            total_length += 1;

            if proposal.id >= cursor {
                newer_matches.push(proposal.id);
            } else if to_skip > 0 {
                to_skip -= 1;
                newer_matches.push(proposal.id);
            } else if page.len() < request.page_size {
                page.push(proposal);
            } else {
                older_matches += 1;
            }
        }
        upper = from_index;
    }

    let next_offset = match page.last() {
        Some(oldest) if older_matches > 0 => Some(PageCursor(oldest.id)),
        _ => None,
    };
    let prev_offset = previous_cursor(&newer_matches, request.page_size, last_proposal_id);

    debug!(
        found = page.len(),
        total_length,
        next = ?next_offset,
        prev = ?prev_offset,
        "proposal page ready"
    );

    Ok(FilteredProposals {
        filtered_proposals: page,
        total_length,
        next_offset,
        prev_offset,
        last_proposal_id,
    })
}

/// Cursor whose page holds the `page_size` matches just above the current
/// page. `newer` lists those matches newest first.
fn previous_cursor(newer: &[u64], page_size: usize, last_proposal_id: u64) -> Option<PageCursor> {
    if newer.is_empty() {
        return None;
    }
    if newer.len() <= page_size {
        return Some(PageCursor(last_proposal_id));
    }
    // The newest id of the previous page is `page_size` entries from the end
    let top = newer[newer.len() - page_size];
    Some(PageCursor(top + 1))
}

/// Current wall-clock time in nanoseconds, the contract's time unit
pub fn now_nanos() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map_or(0, |ns| ns.max(0) as u64)
}

/// Identifies one fetch so a late response can be recognised and dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    page: usize,
}

impl FetchTicket {
    pub fn page(&self) -> usize {
        self.page
    }
}

/// Page navigation state for a proposal list.
///
/// Each fetch is tagged with a [`FetchTicket`]; a response is applied only
/// if no newer fetch or filter change happened since it was issued.
#[derive(Debug, Clone)]
pub struct ProposalPager {
    template: ProposalPageRequest,
    current_page: usize,
    /// Cursor of every visited page; index 0 is the newest page
    cursors: Vec<Option<PageCursor>>,
    generation: u64,
    current: Option<FilteredProposals>,
}

impl ProposalPager {
    pub fn new(template: ProposalPageRequest) -> Self {
        Self {
            template,
            current_page: 0,
            cursors: vec![None],
            generation: 0,
            current: None,
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Cursor of the page being shown
    pub fn cursor(&self) -> Option<PageCursor> {
        self.cursors.get(self.current_page).copied().flatten()
    }

    pub fn current(&self) -> Option<&FilteredProposals> {
        self.current.as_ref()
    }

    pub fn request(&self) -> &ProposalPageRequest {
        &self.template
    }

    /// Start a fetch for the current page
    pub fn begin_fetch(&mut self) -> (FetchTicket, ProposalPageRequest) {
        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            page: self.current_page,
        };
        let request = self.template.clone().with_offset(self.cursor());
        (ticket, request)
    }

    /// Apply a fetch result; returns `false` if it was superseded
    pub fn complete(&mut self, ticket: FetchTicket, result: FilteredProposals) -> bool {
        if ticket.generation != self.generation || ticket.page != self.current_page {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping stale proposal page"
            );
            return false;
        }
        if self.template.last_proposal_id.is_none() {
            self.template.last_proposal_id = Some(result.last_proposal_id);
        }
        self.current = Some(result);
        true
    }

    /// Fetch and apply the current page
    pub async fn fetch<C>(&mut self, contract: &C) -> TreasuryResult<Option<&FilteredProposals>>
    where
        C: DaoContract + ?Sized,
    {
        let (ticket, request) = self.begin_fetch();
        let result = filtered_proposals(contract, &request).await?;
        if self.complete(ticket, result) {
            Ok(self.current.as_ref())
        } else {
            Ok(None)
        }
    }

    pub fn has_next(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|page| page.next_offset.is_some())
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 0
    }

    /// Move to the older page; returns `false` on the last page
    pub fn next(&mut self) -> bool {
        let Some(next) = self.current.as_ref().and_then(|page| page.next_offset) else {
            return false;
        };
        self.cursors.truncate(self.current_page + 1);
        self.cursors.push(Some(next));
        self.current_page += 1;
        self.current = None;
        true
    }

    /// Move to the newer page; returns `false` on the first page
    pub fn prev(&mut self) -> bool {
        if self.current_page == 0 {
            return false;
        }
        self.current_page -= 1;
        self.current = None;
        true
    }

    /// Drop navigation state and start again from the newest proposal.
    /// In-flight fetches are invalidated.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.current_page = 0;
        self.cursors = vec![None];
        self.current = None;
        self.template.last_proposal_id = None;
    }

    /// Replace the kind and status filters, resetting to the first page
    pub fn set_filter(&mut self, kinds: Vec<String>, statuses: Vec<ProposalStatus>) {
        self.template.kinds = kinds;
        self.template.statuses = statuses;
        self.reset();
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.template.page_size = page_size;
        self.reset();
    }
}
