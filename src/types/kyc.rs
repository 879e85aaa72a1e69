use serde::{Deserialize, Serialize};
use std::fmt;

/// Verification state reported by the KYC proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycState {
    Approved,
    Pending,
    NotSubmitted,
    Rejected,
    Expired,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for KycState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            KycState::Approved => "Verified",
            KycState::Pending => "Pending",
            KycState::NotSubmitted => "Not Submitted",
            KycState::Rejected => "Rejected",
            KycState::Expired => "Expired",
            KycState::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

/// Response body of `GET /kyc/{accountId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycStatus {
    #[serde(default)]
    pub account_id: Option<String>,
    pub kyc_status: KycState,
}

impl KycStatus {
    pub fn is_verified(&self) -> bool {
        self.kyc_status == KycState::Approved
    }
}
