//! Error types for treasury dashboard operations
//!
//! Transport-level failures (`chain::Error`, `indexer::IndexerError`) are
//! converted into the structured errors below at the domain boundary, so
//! callers only ever match on [`TreasuryError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::Error as ChainError;
use crate::indexer::IndexerError;
use crate::types::Vote;
use crate::utils::balance::NearToken;

// =============================================================================
// Network Errors
// =============================================================================

/// A JSON-RPC call failed before the contract could answer
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("RPC error: {message}")]
pub struct RpcError {
    /// Detailed error message
    pub message: String,
    /// The RPC URL that failed
    pub rpc_url: Option<String>,
    /// Whether the failure was a transport fault worth retrying
    pub transient: bool,
}

impl RpcError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rpc_url: None,
            transient: false,
        }
    }

    pub fn with_url(message: impl Into<String>, rpc_url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            rpc_url: Some(rpc_url.into()),
            transient: false,
        }
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }
}

/// A contract view method rejected the call or returned unexpected data
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Contract view error: {message}")]
pub struct ContractViewError {
    pub message: String,
    /// Contract account that was queried
    pub contract: Option<String>,
    /// View method that failed
    pub method: Option<String>,
}

impl ContractViewError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            contract: None,
            method: None,
        }
    }

    pub fn with_method(
        message: impl Into<String>,
        contract: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            contract: Some(contract.into()),
            method: Some(method.into()),
        }
    }
}

/// The proposal indexer or KYC proxy could not serve a request
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Indexer error: {message}")]
pub struct IndexerRequestError {
    pub message: String,
    /// HTTP status returned by the service, if any
    pub status_code: Option<u16>,
    pub url: Option<String>,
}

impl IndexerRequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            url: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16, url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
            url: Some(url.into()),
        }
    }
}

// =============================================================================
// Proposal Errors
// =============================================================================

/// The DAO has no proposal with the requested id
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Proposal not found: {message}")]
pub struct ProposalNotFound {
    pub message: String,
    pub dao_id: Option<String>,
    pub proposal_id: Option<u64>,
}

impl ProposalNotFound {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            dao_id: None,
            proposal_id: None,
        }
    }

    pub fn with_id(dao_id: impl Into<String>, proposal_id: u64) -> Self {
        let dao_id = dao_id.into();
        Self {
            message: format!("{} has no proposal #{}", dao_id, proposal_id),
            dao_id: Some(dao_id),
            proposal_id: Some(proposal_id),
        }
    }
}

// =============================================================================
// Voting Errors
// =============================================================================

/// Account balance is below what the action needs
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Insufficient balance: {message}")]
pub struct InsufficientBalance {
    pub message: String,
    pub required: Option<NearToken>,
    pub available: Option<NearToken>,
}

impl InsufficientBalance {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            required: None,
            available: None,
        }
    }

    pub fn with_amounts(message: impl Into<String>, required: NearToken, available: NearToken) -> Self {
        Self {
            message: message.into(),
            required: Some(required),
            available: Some(available),
        }
    }
}

/// A vote flow operation was invoked from a state that does not allow it
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Invalid vote transition: cannot {operation} while {state}")]
pub struct InvalidVoteTransition {
    pub operation: String,
    pub state: String,
}

impl InvalidVoteTransition {
    pub fn new(operation: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            state: state.into(),
        }
    }
}

/// The submitted vote did not show up on chain in time
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Vote timeout: {message}")]
pub struct VoteTimeout {
    pub message: String,
    pub proposal_id: Option<u64>,
    pub vote: Option<Vote>,
    /// Polls made before giving up
    pub attempts: Option<u32>,
}

impl VoteTimeout {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            proposal_id: None,
            vote: None,
            attempts: None,
        }
    }

    pub fn with_details(proposal_id: u64, vote: Vote, attempts: u32) -> Self {
        Self {
            message: format!(
                "{} on proposal #{} not observed after {} polls",
                vote, proposal_id, attempts
            ),
            proposal_id: Some(proposal_id),
            vote: Some(vote),
            attempts: Some(attempts),
        }
    }
}

/// The vote confirmation poll was cancelled
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Vote cancelled: {message}")]
pub struct VoteCancelled {
    pub message: String,
    pub proposal_id: Option<u64>,
}

impl VoteCancelled {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            proposal_id: None,
        }
    }

    pub fn with_proposal(proposal_id: u64) -> Self {
        Self {
            message: format!("stopped waiting for proposal #{}", proposal_id),
            proposal_id: Some(proposal_id),
        }
    }
}

// =============================================================================
// Input Errors
// =============================================================================

/// A caller-supplied parameter is out of range or malformed
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Invalid parameter: {message}")]
pub struct InvalidParameter {
    pub message: String,
    pub parameter: Option<String>,
}

impl InvalidParameter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameter: None,
        }
    }

    pub fn with_parameter(message: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameter: Some(parameter.into()),
        }
    }
}

/// Configuration could not be loaded or failed validation
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[error("Config error: {message}")]
pub struct ConfigError {
    pub message: String,
    pub field: Option<String>,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

// =============================================================================
// Unified Error Enum
// =============================================================================

/// Unified error type for all treasury operations
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum TreasuryError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    ContractView(#[from] ContractViewError),
    #[error(transparent)]
    Indexer(#[from] IndexerRequestError),

    #[error(transparent)]
    ProposalNotFound(#[from] ProposalNotFound),

    #[error(transparent)]
    InsufficientBalance(#[from] InsufficientBalance),
    #[error(transparent)]
    InvalidVoteTransition(#[from] InvalidVoteTransition),
    #[error(transparent)]
    VoteTimeout(#[from] VoteTimeout),
    #[error(transparent)]
    VoteCancelled(#[from] VoteCancelled),

    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameter),
    #[error(transparent)]
    Config(#[from] ConfigError),

    // External library errors (converted to String for Serialize/Deserialize)
    #[error("IO error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// =============================================================================
// From implementations for external error types
// =============================================================================

impl From<ChainError> for TreasuryError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Contract(message) => ContractViewError::new(message).into(),
            ChainError::Decoding(message) => ContractViewError::new(message).into(),
            ChainError::UnknownAccount(account) => {
                ContractViewError::new(format!("account {} does not exist", account)).into()
            }
            other => {
                let transient = other.is_transient();
                let err = RpcError::new(other.to_string());
                if transient {
                    err.transient().into()
                } else {
                    err.into()
                }
            }
        }
    }
}

impl From<IndexerError> for TreasuryError {
    fn from(err: IndexerError) -> Self {
        match &err {
            IndexerError::Status { status, url, .. } => {
                IndexerRequestError::with_status(err.to_string(), *status, url.clone()).into()
            }
            _ => IndexerRequestError::new(err.to_string()).into(),
        }
    }
}

impl From<std::io::Error> for TreasuryError {
    fn from(err: std::io::Error) -> Self {
        TreasuryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TreasuryError {
    fn from(err: serde_json::Error) -> Self {
        TreasuryError::Json(err.to_string())
    }
}

/// Result type alias for treasury operations
pub type TreasuryResult<T> = Result<T, TreasuryError>;

impl TreasuryError {
    /// Create an unknown error from any error type
    pub fn unknown(err: impl std::fmt::Display) -> Self {
        TreasuryError::Unknown(err.to_string())
    }

    /// Whether repeating the same request later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TreasuryError::Rpc(e) => e.transient,
            TreasuryError::Indexer(e) => e.status_code.map_or(true, |code| code >= 500),
            TreasuryError::VoteTimeout(_) => true,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TreasuryError::ProposalNotFound(_))
    }

    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, TreasuryError::InsufficientBalance(_))
    }

    /// Coarse grouping used in log fields
    pub fn category(&self) -> &'static str {
        match self {
            TreasuryError::Rpc(_) => "rpc",
            TreasuryError::ContractView(_) => "contract",
            TreasuryError::Indexer(_) => "indexer",
            TreasuryError::ProposalNotFound(_) => "not_found",
            TreasuryError::InsufficientBalance(_) => "balance",
            TreasuryError::InvalidVoteTransition(_)
            | TreasuryError::VoteTimeout(_)
            | TreasuryError::VoteCancelled(_) => "vote",
            TreasuryError::InvalidParameter(_) => "parameter",
            TreasuryError::Config(_) => "config",
            TreasuryError::Io(_) | TreasuryError::Json(_) => "io",
            TreasuryError::Unknown(_) => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_not_found_message() {
        let err = ProposalNotFound::with_id("treasury.sputnik-dao.near", 42);
        assert_eq!(err.proposal_id, Some(42));
        assert_eq!(
            err.to_string(),
            "Proposal not found: treasury.sputnik-dao.near has no proposal #42"
        );
    }

    #[test]
    fn test_insufficient_balance_amounts() {
        let err = InsufficientBalance::with_amounts(
            "treasury cannot cover fees",
            NearToken::from_yocto(300),
            NearToken::from_yocto(50),
        );
        assert_eq!(err.required, Some(NearToken::from_yocto(300)));
        let unified: TreasuryError = err.into();
        assert!(unified.is_insufficient_balance());
        assert_eq!(unified.category(), "balance");
        assert!(!unified.is_retryable());
    }

    #[test]
    fn test_chain_error_conversion() {
        let contract: TreasuryError = ChainError::Contract("ERR_NO_ROLE".to_string()).into();
        assert!(matches!(contract, TreasuryError::ContractView(_)));
        assert!(!contract.is_retryable());

        let transport: TreasuryError = ChainError::Rpc("node overloaded".to_string()).into();
        assert!(matches!(transport, TreasuryError::Rpc(ref e) if e.transient));
        assert!(transport.is_retryable());

        let open: TreasuryError = ChainError::CircuitOpen.into();
        assert!(!open.is_retryable());
        assert_eq!(open.category(), "rpc");
    }

    #[test]
    fn test_indexer_status_retryability() {
        let server: TreasuryError =
            IndexerRequestError::with_status("bad gateway", 502, "https://idx/proposals").into();
        assert!(server.is_retryable());

        let client: TreasuryError =
            IndexerRequestError::with_status("not found", 404, "https://idx/proposals").into();
        assert!(!client.is_retryable());
    }

    #[test]
    fn test_vote_errors() {
        let err = InvalidVoteTransition::new("confirm", "not voted");
        assert_eq!(
            err.to_string(),
            "Invalid vote transition: cannot confirm while not voted"
        );
        let timeout: TreasuryError = VoteTimeout::with_details(7, Vote::Approve, 60).into();
        assert_eq!(timeout.category(), "vote");
        assert!(timeout.to_string().contains("#7"));
    }

    #[test]
    fn test_error_serialization() {
        let err = TreasuryError::Config(ConfigError::with_field("must be positive", "page_size"));
        let serialized = serde_json::to_string(&err).expect("Should serialize");
        let deserialized: TreasuryError =
            serde_json::from_str(&serialized).expect("Should deserialize");
        assert!(matches!(deserialized, TreasuryError::Config(ref e) if e.field.as_deref() == Some("page_size")));
    }
}
