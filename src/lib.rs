pub mod chain;
pub mod cli;
pub mod config;
pub mod contract;
pub mod core;
pub mod errors;
pub mod events;
pub mod indexer;
pub mod logging;
pub mod queries;
pub mod types;
pub mod utils;
pub mod voting;

pub use chain::{Error as ChainError, NearRpcClient};
pub use config::{Config, Network, PollSettings};
pub use contract::{DaoContract, ProposalActor, SputnikDao};
pub use events::{DashboardEvent, RefreshBus};
pub use indexer::{IndexerClient, IndexerError, IndexerPage, IndexerQuery};

// Re-export logging module
pub use logging::{
    init_default_logging, init_logging, is_initialized, CompactFormatter, LogFormat,
    LoggingConfig, TreasuryFormatter,
};

pub use types::*;

pub use queries::{
    approvers_and_threshold, category_approvers, filtered_proposals, required_votes_for,
    ApproverGroup, ApproverPurpose, DescriptionFilter, FeedQuery, FeedSource, FetchTicket,
    FilteredProposals, PageCursor, ProposalFeed, ProposalPage, ProposalPageRequest, ProposalPager,
};

pub use utils::balance::NearToken;
pub use utils::{decode_field, decode_fields, encode_description};

pub use voting::{
    wait_for_vote_change, BalanceCheck, CancelToken, PollConfig, VoteFlow, VoteState,
};

// Re-export comprehensive error types
pub use errors::{
    ConfigError, ContractViewError, IndexerRequestError, InsufficientBalance,
    InvalidParameter, InvalidVoteTransition, ProposalNotFound, RpcError, TreasuryError,
    TreasuryResult, VoteCancelled, VoteTimeout,
};
