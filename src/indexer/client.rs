//! HTTP client for the proposal indexer and KYC proxy

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::{IndexerError, IndexerPage, IndexerQuery};
use crate::core::constants::{DEFAULT_INDEXER_URL, DEFAULT_KYC_URL};
use crate::types::{KycStatus, ProposalCategory};

/// Default timeout for indexer requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Longest error body kept in [`IndexerError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// REST client for the proposal indexer
///
/// # Example
///
/// ```ignore
/// use sputnik_treasury::indexer::{IndexerClient, IndexerQuery};
///
/// let indexer = IndexerClient::new("https://sputnik-indexer.fly.dev")?;
/// let page = indexer
///     .proposals(&IndexerQuery::new("treasury.sputnik-dao.near"))
///     .await?;
/// println!("{} proposals in total", page.total);
/// ```
#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
    kyc_url: Option<String>,
}

impl IndexerClient {
    /// Create an indexer client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Indexer root, e.g. `https://sputnik-indexer.fly.dev`
    ///
    /// # Returns
    ///
    /// A client without a KYC proxy; see [`IndexerClient::with_kyc_url`]
    pub fn new(base_url: impl Into<String>) -> Result<Self, IndexerError> {
        let base_url = normalize_base(base_url.into())?;
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            kyc_url: None,
        })
    }

    /// Client for the public indexer and KYC proxy
    pub fn with_defaults() -> Result<Self, IndexerError> {
        Self::new(DEFAULT_INDEXER_URL)?.with_kyc_url(DEFAULT_KYC_URL)
    }

    /// Set the KYC proxy root
    pub fn with_kyc_url(mut self, kyc_url: impl Into<String>) -> Result<Self, IndexerError> {
        self.kyc_url = Some(normalize_base(kyc_url.into())?);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of `GET /proposals` for `query`
    pub fn proposals_url(&self, query: &IndexerQuery) -> Result<Url, IndexerError> {
        Url::parse_with_params(&format!("{}/proposals", self.base_url), query.params())
            .map_err(|e| IndexerError::InvalidUrl(e.to_string()))
    }

    /// Fetch one page of proposals with server-side filtering
    ///
    /// # Arguments
    ///
    /// * `query` - DAO, category, page and filter parameters
    ///
    /// # Returns
    ///
    /// The page's proposals and the total number of matches
    pub async fn proposals(&self, query: &IndexerQuery) -> Result<IndexerPage, IndexerError> {
        let url = self.proposals_url(query)?;
        debug!(%url, "indexer proposals request");
        let page: IndexerPage = self.get_json(url).await?;
        debug!(count = page.proposals.len(), total = page.total, "indexer page");
        Ok(page)
    }

    /// URL of the CSV export of a DAO's proposals
    pub fn csv_export_url(
        &self,
        dao_id: &str,
        category: Option<ProposalCategory>,
    ) -> Result<Url, IndexerError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| IndexerError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| IndexerError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["csv", "proposals", dao_id]);
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category.slug());
        }
        Ok(url)
    }

    /// Download the CSV export
    pub async fn export_csv(
        &self,
        dao_id: &str,
        category: Option<ProposalCategory>,
    ) -> Result<String, IndexerError> {
        let url = self.csv_export_url(dao_id, category)?;
        debug!(%url, "indexer csv export");
        let response = self.send(url).await?;
        Ok(response.text().await?)
    }

    /// Verification state of `account_id` from the KYC proxy
    pub async fn kyc_status(&self, account_id: &str) -> Result<KycStatus, IndexerError> {
        let base = self.kyc_url.as_deref().ok_or(IndexerError::NotConfigured("KYC"))?;
        let mut url = Url::parse(base).map_err(|e| IndexerError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| IndexerError::InvalidUrl(format!("{} cannot be a base", base)))?
            .pop_if_empty()
            .extend(["kyc", account_id]);

        let mut status: KycStatus = self.get_json(url).await?;
        if status.account_id.is_none() {
            status.account_id = Some(account_id.to_string());
        }
        Ok(status)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, IndexerError> {
        let response = self.send(url).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| IndexerError::Decode(e.to_string()))
    }

    async fn send(&self, url: Url) -> Result<Response, IndexerError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|i| body.is_char_boundary(*i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        warn!(%url, status = status.as_u16(), "indexer request failed");
        Err(IndexerError::Status {
            status: status.as_u16(),
            url: url.to_string(),
            body,
        })
    }
}

fn normalize_base(url: String) -> Result<String, IndexerError> {
    let trimmed = url.trim().trim_end_matches('/').to_string();
    let parsed = Url::parse(&trimmed).map_err(|e| IndexerError::InvalidUrl(format!("{}: {}", url, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(IndexerError::InvalidUrl(format!(
            "{}: scheme must be http or https",
            url
        )));
    }
    Ok(trimmed)
}
