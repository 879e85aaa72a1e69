//! Core constants for NEAR and the Sputnik-DAO contract
//! These match the values used by the treasury dashboard

/// yoctoNEAR per NEAR (1 NEAR = 10^24 yoctoNEAR)
pub const YOCTO_PER_NEAR: u128 = 1_000_000_000_000_000_000_000_000;

/// Number of fractional digits in a NEAR amount
pub const NEAR_DECIMALS: u32 = 24;

#[allow(dead_code)]
const _: () = assert!(
    YOCTO_PER_NEAR == 10u128.pow(NEAR_DECIMALS),
    "YOCTO_PER_NEAR must equal 10^24"
);

/// yoctoNEAR locked per byte of account storage
pub const STORAGE_PRICE_PER_BYTE: u128 = 10_000_000_000_000_000_000;

/// NEAR symbol used for display
pub const NEAR_SYMBOL: &str = "N";

/// Network names
pub const NETWORK_MAINNET: &str = "mainnet";
pub const NETWORK_TESTNET: &str = "testnet";
pub const NETWORK_LOCAL: &str = "local";

/// Default network
pub const DEFAULT_NETWORK: &str = NETWORK_MAINNET;

/// JSON-RPC endpoints
pub const MAINNET_RPC_ENDPOINT: &str = "https://rpc.mainnet.near.org";
pub const TESTNET_RPC_ENDPOINT: &str = "https://rpc.testnet.near.org";
pub const LOCAL_RPC_ENDPOINT: &str = "http://127.0.0.1:3030";

/// Default endpoint
pub const DEFAULT_RPC_ENDPOINT: &str = MAINNET_RPC_ENDPOINT;

/// Proposal indexer serving pre-filtered proposal pages and CSV exports
pub const DEFAULT_INDEXER_URL: &str = "https://sputnik-indexer.fly.dev";

/// KYC proxy
pub const DEFAULT_KYC_URL: &str = "https://neardevhub-kyc-proxy.shuttleapp.rs";

/// Rows per proposal table page
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Upper bound accepted for a single page
pub const MAX_PAGE_SIZE: usize = 100;

/// Number of proposals fetched per `get_proposals` batch while scanning
pub const PROPOSAL_BATCH_SIZE: u64 = 30;

/// Interval between `get_proposal` polls after a vote is submitted
pub const VOTE_POLL_INTERVAL_MS: u64 = 1_000;

/// Maximum number of polls before the vote is considered unconfirmed
pub const VOTE_POLL_MAX_ATTEMPTS: u32 = 60;

/// Overall deadline for vote confirmation
pub const VOTE_POLL_TIMEOUT_SECS: u64 = 90;

/// Balance below which voting is refused (in NEAR)
pub const INSUFFICIENT_BALANCE_LIMIT_NEAR: &str = "0.3";

/// Default JSON-RPC requests per second
pub const DEFAULT_RATE_LIMIT_PER_SECOND: u32 = 20;

/// Gas attached to `act_proposal` (300 TGas)
pub const ACT_PROPOSAL_GAS: u64 = 300_000_000_000_000;

/// Permission suffixes that grant voting rights
pub const VOTE_ACTIONS: &[&str] = &["VoteApprove", "VoteReject", "VoteRemove"];
