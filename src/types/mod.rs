pub mod category;
pub mod kyc;
pub mod policy;
pub mod proposal;
pub mod token;

pub use category::ProposalCategory;
pub use kyc::{KycState, KycStatus};
pub use policy::{Policy, Role, RoleKind, Threshold, VotePolicy, WeightKind};
pub use proposal::{
    is_valid_account_id, AccountId, ActProposalRequest, Action, Proposal, ProposalKind, ProposalStatus, Vote,
};
pub use token::FtMetadata;
