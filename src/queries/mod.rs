//! Derived views over DAO state
//!
//! Approver sets, paginated proposal lists and the source-agnostic feed.

pub mod approvers;
pub mod feed;
pub mod proposals;

pub use approvers::{
    approvers_and_threshold, category_approvers, required_votes_for, ApproverGroup,
    ApproverPurpose,
};
pub use feed::{FeedQuery, FeedSource, ProposalFeed, ProposalPage};
pub use proposals::{
    filtered_proposals, DescriptionFilter, FetchTicket, FilteredProposals, PageCursor,
    ProposalPageRequest, ProposalPager,
};
