//! NEAR JSON-RPC client for read-only contract calls

pub mod connection;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use governor::DefaultDirectRateLimiter;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::core::constants::{
    DEFAULT_RATE_LIMIT_PER_SECOND, DEFAULT_RPC_ENDPOINT, STORAGE_PRICE_PER_BYTE,
};
use crate::utils::balance::NearToken;
pub use connection::{
    execute_with_retry, rate_limiter, CircuitBreaker, CircuitBreakerState, RetryConfig,
    RPC_OPERATION_TIMEOUT,
};

/// Error types for RPC operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC error: {0}")]
    Rpc(String),
    /// The contract rejected the call (panic, missing method, bad args)
    #[error("Contract error: {0}")]
    Contract(String),
    #[error("Account {0} does not exist")]
    UnknownAccount(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
    #[error("Decoding error: {0}")]
    Decoding(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Circuit breaker is open - too many failures")]
    CircuitOpen,
}

impl Error {
    /// Classify a transport failure, separating timeouts
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(err)
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_builder() && !e.is_decode(),
            Error::Rpc(_) | Error::Timeout => true,
            _ => false,
        }
    }
}

/// Finality used for view calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Optimistic,
    Final,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: QueryParams<'a>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
enum QueryParams<'a> {
    CallFunction {
        finality: Finality,
        account_id: &'a str,
        method_name: &'a str,
        args_base64: String,
    },
    ViewAccount {
        finality: Finality,
        account_id: &'a str,
    },
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    cause: Option<RpcErrorCause>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorCause {
    name: String,
    #[serde(default)]
    info: Option<serde_json::Value>,
}

impl RpcErrorBody {
    fn into_error(self, account_id: &str) -> Error {
        let detail = self
            .data
            .as_ref()
            .map(|d| match d {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .or(self.message.clone())
            .unwrap_or_default();

        match (self.name.as_deref(), self.cause.as_ref().map(|c| c.name.as_str())) {
            (_, Some("UNKNOWN_ACCOUNT")) => Error::UnknownAccount(account_id.to_string()),
            (Some("HANDLER_ERROR"), Some(cause)) => {
                let info = self
                    .cause
                    .as_ref()
                    .and_then(|c| c.info.as_ref())
                    .map(|i| i.to_string())
                    .unwrap_or(detail);
                Error::Contract(format!("{}: {}", cause, info))
            }
            _ => Error::Rpc(detail),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallResult {
    #[serde(default)]
    result: Vec<u8>,
    /// Older nodes report contract failures inside a successful response
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
}

/// Result of a `view_account` query
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountView {
    pub amount: NearToken,
    pub locked: NearToken,
    #[serde(default)]
    pub storage_usage: u64,
    #[serde(default)]
    pub code_hash: String,
}

impl AccountView {
    /// NEAR held back to pay for `storage_usage`
    pub fn storage_locked(&self) -> NearToken {
        NearToken::from_yocto((self.storage_usage as u128).saturating_mul(STORAGE_PRICE_PER_BYTE))
    }

    /// Balance available for spending: the liquid amount minus storage
    pub fn available(&self) -> NearToken {
        self.amount.saturating_sub(self.storage_locked())
    }
}

/// JSON-RPC client for a NEAR node
#[derive(Debug, Clone)]
pub struct NearRpcClient {
    http: Client,
    endpoint: String,
    finality: Finality,
    retry: RetryConfig,
    breaker: Arc<CircuitBreaker>,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl NearRpcClient {
    /// Create a client for the given JSON-RPC endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self, Error> {
        let http = Client::builder()
            .pool_max_idle_per_host(10)
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(RPC_OPERATION_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            finality: Finality::Final,
            retry: RetryConfig::default(),
            breaker: Arc::new(CircuitBreaker::new()),
            limiter: Arc::new(rate_limiter(DEFAULT_RATE_LIMIT_PER_SECOND)),
        })
    }

    /// Create a client for the default mainnet endpoint
    pub fn with_default() -> Result<Self, Error> {
        Self::new(DEFAULT_RPC_ENDPOINT)
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = Arc::new(rate_limiter(per_second));
        self
    }

    pub fn with_finality(mut self, finality: Finality) -> Self {
        self.finality = finality;
        self
    }

    /// Get the RPC URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Call a view method and decode its JSON result
    pub async fn view_function<T: DeserializeOwned>(
        &self,
        account_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<T, Error> {
        let bytes = self.view_function_raw(account_id, method_name, args).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::Decoding(format!(
                "{}.{} returned unexpected JSON: {}",
                account_id, method_name, e
            ))
        })
    }

    /// Call a view method and return the raw result bytes
    pub async fn view_function_raw(
        &self,
        account_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<Vec<u8>, Error> {
        let args_json = serde_json::to_vec(args).map_err(|e| Error::Encoding(e.to_string()))?;
        let args_base64 = BASE64.encode(args_json);
        debug!(account_id, method_name, "view call");

        let result: CallResult = self
            .query(
                account_id,
                QueryParams::CallFunction {
                    finality: self.finality,
                    account_id,
                    method_name,
                    args_base64,
                },
            )
            .await?;

        for log in &result.logs {
            trace!(account_id, method_name, "contract log: {}", log);
        }
        if let Some(error) = result.error {
            return Err(Error::Contract(error));
        }
        Ok(result.result)
    }

    /// Fetch account state, including its NEAR balance
    pub async fn view_account(&self, account_id: &str) -> Result<AccountView, Error> {
        self.query(
            account_id,
            QueryParams::ViewAccount {
                finality: self.finality,
                account_id,
            },
        )
        .await
    }

    async fn query<T: DeserializeOwned>(
        &self,
        account_id: &str,
        params: QueryParams<'_>,
    ) -> Result<T, Error> {
        let params = &params;
        execute_with_retry(&self.breaker, &self.retry, || async move {
            self.limiter.until_ready().await;
            let request = RpcRequest {
                jsonrpc: "2.0",
                id: Uuid::new_v4().to_string(),
                method: "query",
                params: params.clone(),
            };
            let response: RpcResponse<T> = self
                .http
                .post(&self.endpoint)
                .json(&request)
                .send()
                .await
                .map_err(Error::from_transport)?
                .error_for_status()?
                .json()
                .await?;
            decode_response(response, account_id)
        })
        .await
    }
}

fn decode_response<T>(response: RpcResponse<T>, account_id: &str) -> Result<T, Error> {
    match (response.result, response.error) {
        (_, Some(error)) => Err(error.into_error(account_id)),
        (Some(result), None) => Ok(result),
        (None, None) => Err(Error::Decoding(
            "RPC response has neither result nor error".to_string(),
        )),
    }
}
