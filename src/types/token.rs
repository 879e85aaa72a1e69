use serde::{Deserialize, Serialize};

use crate::utils::balance::format_units;

/// NEP-148 fungible token metadata returned by `ft_metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtMetadata {
    pub spec: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub decimals: u8,
}

impl FtMetadata {
    /// Metadata describing native NEAR, used when a transfer has no token id
    pub fn native_near() -> Self {
        Self {
            spec: "ft-1.0.0".to_string(),
            name: "NEAR".to_string(),
            symbol: "NEAR".to_string(),
            icon: None,
            reference: None,
            decimals: 24,
        }
    }

    /// Render a raw integer amount with this token's decimals
    pub fn format_amount(&self, raw: u128) -> String {
        format!("{} {}", format_units(raw, self.decimals as u32), self.symbol)
    }
}
