//! Proposal indexer and KYC proxy REST clients
//!
//! The indexer serves proposals with server-side filtering and sorting, so a
//! page costs one request instead of a scan over every proposal id.

pub mod client;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::types::{Proposal, ProposalCategory, ProposalStatus};

pub use client::IndexerClient;

/// Errors that can occur talking to the indexer or KYC proxy
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}: {body}")]
    Status { status: u16, url: String, body: String },
    #[error("Unexpected response body: {0}")]
    Decode(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("No {0} URL configured")]
    NotConfigured(&'static str),
}

/// Result ordering by proposal id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(format!("Unknown sort direction '{}'. Valid options: asc, desc", s)),
        }
    }
}

/// Parameters of `GET /proposals`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerQuery {
    pub dao_id: String,
    pub category: Option<ProposalCategory>,
    /// Zero-based page number
    pub page: usize,
    pub page_size: usize,
    pub statuses: Vec<ProposalStatus>,
    /// Contract kind names, e.g. `Transfer`
    pub proposal_type: Vec<String>,
    pub sort_direction: SortDirection,
}

impl IndexerQuery {
    pub fn new(dao_id: impl Into<String>) -> Self {
        Self {
            dao_id: dao_id.into(),
            category: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            statuses: Vec::new(),
            proposal_type: Vec::new(),
            sort_direction: SortDirection::Desc,
        }
    }

    pub fn with_category(mut self, category: ProposalCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ProposalStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_proposal_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.proposal_type = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    /// Query string pairs; empty filters are omitted
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("daoId", self.dao_id.clone())];
        if let Some(category) = self.category {
            params.push(("category", category.slug().to_string()));
        }
        params.push(("page", self.page.to_string()));
        params.push(("pageSize", self.page_size.to_string()));
        if !self.statuses.is_empty() {
            let statuses: Vec<&str> = self.statuses.iter().map(|s| s.as_str()).collect();
            params.push(("statuses", statuses.join(",")));
        }
        if !self.proposal_type.is_empty() {
            params.push(("proposalType", self.proposal_type.join(",")));
        }
        params.push(("sortDirection", self.sort_direction.to_string()));
        params
    }
}

/// Body of `GET /proposals`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerPage {
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub total: u64,
}
