//! One proposal listing API over the indexer and the contract scan

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::proposals::{filtered_proposals, PageCursor, ProposalPageRequest};
use crate::contract::DaoContract;
use crate::core::constants::DEFAULT_PAGE_SIZE;
use crate::errors::{IndexerRequestError, TreasuryResult};
use crate::indexer::{IndexerClient, IndexerQuery, SortDirection};
use crate::types::{Proposal, ProposalCategory, ProposalStatus};

/// Where proposal pages come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Indexer,
    Contract,
    /// Indexer when reachable, contract scan otherwise
    #[default]
    Auto,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Indexer => write!(f, "indexer"),
            FeedSource::Contract => write!(f, "contract"),
            FeedSource::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for FeedSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "indexer" => Ok(FeedSource::Indexer),
            "contract" | "rpc" => Ok(FeedSource::Contract),
            "auto" => Ok(FeedSource::Auto),
            _ => Err(format!(
                "Unknown feed source '{}'. Valid options: indexer, contract, auto",
                s
            )),
        }
    }
}

/// A page of proposals in a shape shared by both data paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalPage {
    /// Newest first
    pub proposals: Vec<Proposal>,
    pub total: u64,
    /// Path that produced this page; never `Auto`
    pub source: FeedSource,
    /// Cursor of the following page when served by the contract scan
    pub next_offset: Option<PageCursor>,
}

/// What to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub dao_id: String,
    pub category: Option<ProposalCategory>,
    pub statuses: Vec<ProposalStatus>,
    /// Zero-based page number
    pub page: usize,
    pub page_size: usize,
    /// Voting period for the contract path's expiry check
    pub proposal_period: Option<u64>,
}

impl FeedQuery {
    pub fn new(dao_id: impl Into<String>) -> Self {
        Self {
            dao_id: dao_id.into(),
            category: None,
            statuses: Vec::new(),
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            proposal_period: None,
        }
    }

    pub fn with_category(mut self, category: ProposalCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ProposalStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn with_proposal_period(mut self, period_ns: Option<u64>) -> Self {
        self.proposal_period = period_ns;
        self
    }

    fn indexer_query(&self) -> IndexerQuery {
        let mut query = IndexerQuery::new(self.dao_id.clone())
            .with_page(self.page, self.page_size)
            .with_statuses(self.statuses.iter().copied())
            .with_sort(SortDirection::Desc);
        if let Some(category) = self.category {
            query = query.with_category(category);
        }
        query
    }

    fn scan_request(&self) -> ProposalPageRequest {
        let request = ProposalPageRequest::new(self.dao_id.clone())
            .with_page_size(self.page_size)
            .with_statuses(self.statuses.iter().copied())
            .with_current_page(self.page)
            .with_proposal_period(self.proposal_period);
        match self.category {
            Some(category) => request.for_category(category),
            None => request,
        }
    }
}

/// Lists proposals from the configured source
#[derive(Clone)]
pub struct ProposalFeed {
    contract: Arc<dyn DaoContract>,
    indexer: Option<IndexerClient>,
    source: FeedSource,
}

impl ProposalFeed {
    pub fn new(contract: Arc<dyn DaoContract>) -> Self {
        Self {
            contract,
            indexer: None,
            source: FeedSource::Auto,
        }
    }

    pub fn with_indexer(mut self, indexer: IndexerClient) -> Self {
        self.indexer = Some(indexer);
        self
    }

    pub fn with_source(mut self, source: FeedSource) -> Self {
        self.source = source;
        self
    }

    pub fn source(&self) -> FeedSource {
        self.source
    }

    /// Fetch one page.
    ///
    /// `Auto` tries the indexer first and falls back to the contract scan
    /// when no indexer is configured or the request fails.
    pub async fn page(&self, query: &FeedQuery) -> TreasuryResult<ProposalPage> {
        match (self.source, &self.indexer) {
            (FeedSource::Contract, _) => self.from_contract(query).await,
            (FeedSource::Indexer, Some(indexer)) => Self::from_indexer(indexer, query).await,
            (FeedSource::Indexer, None) => {
                Err(IndexerRequestError::new("feed source is indexer but no indexer URL is set").into())
            }
            (FeedSource::Auto, None) => self.from_contract(query).await,
            (FeedSource::Auto, Some(indexer)) => match Self::from_indexer(indexer, query).await {
                Ok(page) => Ok(page),
                Err(e) => {
                    warn!(dao_id = %query.dao_id, "indexer unavailable, scanning contract: {}", e);
                    self.from_contract(query).await
                }
            },
        }
    }

    async fn from_indexer(indexer: &IndexerClient, query: &FeedQuery) -> TreasuryResult<ProposalPage> {
        let page = indexer.proposals(&query.indexer_query()).await?;
        debug!(total = page.total, "proposal page from indexer");
        Ok(ProposalPage {
            proposals: page.proposals,
            total: page.total,
            source: FeedSource::Indexer,
            next_offset: None,
        })
    }

    async fn from_contract(&self, query: &FeedQuery) -> TreasuryResult<ProposalPage> {
        let result = filtered_proposals(self.contract.as_ref(), &query.scan_request()).await?;
        debug!(total = result.total_length, "proposal page from contract scan");
        Ok(ProposalPage {
            proposals: result.filtered_proposals,
            total: result.total_length as u64,
            source: FeedSource::Contract,
            next_offset: result.next_offset,
        })
    }
}

impl fmt::Debug for ProposalFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalFeed")
            .field("indexer", &self.indexer.as_ref().map(|i| i.base_url()))
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_source_parse() {
        assert_eq!("Indexer".parse::<FeedSource>().unwrap(), FeedSource::Indexer);
        assert_eq!("rpc".parse::<FeedSource>().unwrap(), FeedSource::Contract);
        assert!("cache".parse::<FeedSource>().is_err());
        assert_eq!(FeedSource::default(), FeedSource::Auto);
    }

    #[test]
    fn test_query_translation() {
        let query = FeedQuery::new("dao.near")
            .with_category(ProposalCategory::Settings)
            .with_statuses(ProposalStatus::PENDING)
            .with_page(3, 20);

        let indexer = query.indexer_query();
        assert_eq!(indexer.page, 3);
        assert_eq!(indexer.category, Some(ProposalCategory::Settings));

        let scan = query.scan_request();
        assert_eq!(scan.current_page, 3);
        assert_eq!(scan.page_size, 20);
        assert!(scan.kinds.contains(&"ChangePolicy".to_string()));
        assert!(scan.description_filter.is_some());
    }
}
