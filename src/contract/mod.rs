//! Read and write interfaces of a Sputnik-DAO contract
//!
//! [`DaoContract`] covers the view methods the dashboard needs;
//! [`SputnikDao`] implements it over JSON-RPC. Writes go through
//! [`ProposalActor`], which is provided by whatever holds the signing key.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::chain::{Error as ChainError, NearRpcClient};
use crate::errors::{ContractViewError, ProposalNotFound, TreasuryError, TreasuryResult};
use crate::types::{ActProposalRequest, FtMetadata, Policy, Proposal};
use crate::utils::balance::NearToken;

/// Panic message of `get_proposal` for an unknown id
const ERR_NO_PROPOSAL: &str = "ERR_NO_PROPOSAL";

/// Read access to a DAO and the token contracts its proposals reference
#[async_trait]
pub trait DaoContract: Send + Sync {
    /// Current roles, permissions and vote policies
    async fn get_policy(&self, dao_id: &str) -> TreasuryResult<Policy>;

    /// Number of proposals ever created; valid ids are `0..last`
    async fn get_last_proposal_id(&self, dao_id: &str) -> TreasuryResult<u64>;

    async fn get_proposal(&self, dao_id: &str, id: u64) -> TreasuryResult<Proposal>;

    /// Up to `limit` proposals with ids starting at `from_index`, ascending
    async fn get_proposals(
        &self,
        dao_id: &str,
        from_index: u64,
        limit: u64,
    ) -> TreasuryResult<Vec<Proposal>>;

    /// NEP-148 metadata; an empty `token_id` denotes native NEAR
    async fn ft_metadata(&self, token_id: &str) -> TreasuryResult<FtMetadata>;

    /// Spendable NEAR balance of an account
    async fn account_balance(&self, account_id: &str) -> TreasuryResult<NearToken>;
}

/// Submits `act_proposal` on behalf of the signed-in account
#[async_trait]
pub trait ProposalActor: Send + Sync {
    /// Account whose vote is being cast
    fn account_id(&self) -> &str;

    async fn act_proposal(&self, request: &ActProposalRequest) -> TreasuryResult<()>;
}

/// Sputnik-DAO view calls over NEAR JSON-RPC
#[derive(Debug, Clone)]
pub struct SputnikDao {
    client: NearRpcClient,
}

impl SputnikDao {
    pub fn new(client: NearRpcClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &NearRpcClient {
        &self.client
    }

    async fn view<T: serde::de::DeserializeOwned>(
        &self,
        account_id: &str,
        method: &str,
        args: serde_json::Value,
    ) -> TreasuryResult<T> {
        self.client
            .view_function(account_id, method, &args)
            .await
            .map_err(|e| view_error(e, account_id, method))
    }
}

fn view_error(err: ChainError, account_id: &str, method: &str) -> TreasuryError {
    match err {
        ChainError::Contract(message) | ChainError::Decoding(message) => {
            ContractViewError::with_method(message, account_id, method).into()
        }
        other => other.into(),
    }
}

#[async_trait]
impl DaoContract for SputnikDao {
    #[instrument(skip(self), level = "debug")]
    async fn get_policy(&self, dao_id: &str) -> TreasuryResult<Policy> {
        self.view(dao_id, "get_policy", json!({})).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_last_proposal_id(&self, dao_id: &str) -> TreasuryResult<u64> {
        self.view(dao_id, "get_last_proposal_id", json!({})).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_proposal(&self, dao_id: &str, id: u64) -> TreasuryResult<Proposal> {
        match self
            .client
            .view_function(dao_id, "get_proposal", &json!({ "id": id }))
            .await
        {
            Ok(proposal) => Ok(proposal),
            Err(ChainError::Contract(message)) if message.contains(ERR_NO_PROPOSAL) => {
                Err(ProposalNotFound::with_id(dao_id, id).into())
            }
            Err(e) => Err(view_error(e, dao_id, "get_proposal")),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn get_proposals(
        &self,
        dao_id: &str,
        from_index: u64,
        limit: u64,
    ) -> TreasuryResult<Vec<Proposal>> {
        let proposals: Vec<Proposal> = self
            .view(
                dao_id,
                "get_proposals",
                json!({ "from_index": from_index, "limit": limit }),
            )
            .await?;
        debug!(count = proposals.len(), "fetched proposal batch");
        Ok(proposals)
    }

    async fn ft_metadata(&self, token_id: &str) -> TreasuryResult<FtMetadata> {
        if token_id.is_empty() || token_id == "near" {
            return Ok(FtMetadata::native_near());
        }
        self.view(token_id, "ft_metadata", json!({})).await
    }

    async fn account_balance(&self, account_id: &str) -> TreasuryResult<NearToken> {
        let view = self.client.view_account(account_id).await?;
        Ok(view.available())
    }
}
