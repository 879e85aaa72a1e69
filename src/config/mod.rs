//! Dashboard configuration
//!
//! Values come from, in increasing precedence: built-in defaults, a JSON
//! config file, `TREASURY_*` environment variables and CLI flags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::chain::RetryConfig;
use crate::core::constants::{
    self, DEFAULT_PAGE_SIZE, DEFAULT_RATE_LIMIT_PER_SECOND, INSUFFICIENT_BALANCE_LIMIT_NEAR,
    MAX_PAGE_SIZE, VOTE_POLL_INTERVAL_MS, VOTE_POLL_MAX_ATTEMPTS, VOTE_POLL_TIMEOUT_SECS,
};
use crate::errors::ConfigError;
use crate::logging::LoggingConfig;
use crate::queries::FeedSource;
use crate::types::is_valid_account_id;
use crate::utils::balance::NearToken;
use crate::voting::PollConfig;

/// Retry schedule for RPC calls
pub type RetrySettings = RetryConfig;

/// File name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// NEAR network selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Local,
    /// Explicit RPC endpoint
    Custom,
}

impl Network {
    /// Well-known RPC endpoint; `None` for custom networks
    pub fn rpc_endpoint(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some(constants::MAINNET_RPC_ENDPOINT),
            Network::Testnet => Some(constants::TESTNET_RPC_ENDPOINT),
            Network::Local => Some(constants::LOCAL_RPC_ENDPOINT),
            Network::Custom => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => constants::NETWORK_MAINNET,
            Network::Testnet => constants::NETWORK_TESTNET,
            Network::Local => constants::NETWORK_LOCAL,
            Network::Custom => "custom",
        }
    }

    /// Network whose endpoint is `url`, or `Custom`
    pub fn from_endpoint(url: &str) -> Self {
        let url = url.trim_end_matches('/');
        [Network::Mainnet, Network::Testnet, Network::Local]
            .into_iter()
            .find(|n| n.rpc_endpoint() == Some(url))
            .unwrap_or(Network::Custom)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "local" | "localnet" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            _ => Err(format!(
                "Unknown network '{}'. Valid options: mainnet, testnet, local, custom",
                s
            )),
        }
    }
}

/// Bounds of the vote confirmation poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: VOTE_POLL_INTERVAL_MS,
            max_attempts: VOTE_POLL_MAX_ATTEMPTS,
            timeout_secs: VOTE_POLL_TIMEOUT_SECS,
        }
    }
}

impl From<PollSettings> for PollConfig {
    fn from(settings: PollSettings) -> Self {
        PollConfig {
            interval: Duration::from_millis(settings.interval_ms),
            max_attempts: settings.max_attempts,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: Network,
    pub rpc_endpoint: String,
    /// Proposal indexer root; `None` disables the indexer path
    pub indexer_url: Option<String>,
    pub kyc_url: Option<String>,
    /// Treasury DAO contract, e.g. `treasury.sputnik-dao.near`
    pub dao_id: Option<String>,
    pub page_size: usize,
    pub feed_source: FeedSource,
    pub poll: PollSettings,
    pub retry: RetrySettings,
    /// Minimum voter balance in NEAR, as a decimal string
    pub insufficient_balance_limit: String,
    pub rate_limit_per_second: u32,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            rpc_endpoint: constants::MAINNET_RPC_ENDPOINT.to_string(),
            indexer_url: Some(constants::DEFAULT_INDEXER_URL.to_string()),
            kyc_url: Some(constants::DEFAULT_KYC_URL.to_string()),
            dao_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            feed_source: FeedSource::Auto,
            poll: PollSettings::default(),
            retry: RetrySettings::default(),
            insufficient_balance_limit: INSUFFICIENT_BALANCE_LIMIT_NEAR.to_string(),
            rate_limit_per_second: DEFAULT_RATE_LIMIT_PER_SECOND,
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults for `network`; custom networks keep the mainnet endpoint
    /// until one is set
    pub fn for_network(network: Network) -> Self {
        Self::default().with_network(network)
    }

    /// Select a network and its default endpoint
    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        if let Some(endpoint) = network.rpc_endpoint() {
            self.rpc_endpoint = endpoint.to_string();
        }
        self
    }

    /// Set the RPC endpoint directly
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rpc_endpoint = endpoint.into();
        self.network = Network::from_endpoint(&self.rpc_endpoint);
        self
    }

    pub fn with_dao(mut self, dao_id: impl Into<String>) -> Self {
        self.dao_id = Some(dao_id.into());
        self
    }

    pub fn with_indexer(mut self, indexer_url: Option<String>) -> Self {
        self.indexer_url = indexer_url;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_feed_source(mut self, source: FeedSource) -> Self {
        self.feed_source = source;
        self
    }

    pub fn with_poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.logging.debug = debug;
        self
    }

    /// `~/.config/sputnik-treasury/config.json` or the platform equivalent
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sputnik-treasury").join(CONFIG_FILE_NAME))
    }

    /// Load a JSON config file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::with_field(format!("cannot read {}: {}", path.display(), e), "path")
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| ConfigError::new(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::new(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::new(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ConfigError::new(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Load config from environment variables
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply `TREASURY_*` overrides on top of `self`
    pub fn merge_env(mut self) -> Self {
        if let Some(network) = env_parse::<Network>("TREASURY_NETWORK") {
            self = self.with_network(network);
        }
        if let Ok(endpoint) = std::env::var("TREASURY_RPC") {
            self = self.with_endpoint(endpoint);
        }
        if let Ok(url) = std::env::var("TREASURY_INDEXER_URL") {
            self.indexer_url = (!url.is_empty()).then_some(url);
        }
        if let Ok(url) = std::env::var("TREASURY_KYC_URL") {
            self.kyc_url = (!url.is_empty()).then_some(url);
        }
        if let Ok(dao) = std::env::var("TREASURY_DAO") {
            self.dao_id = Some(dao);
        }
        if let Some(page_size) = env_parse("TREASURY_PAGE_SIZE") {
            self.page_size = page_size;
        }
        if let Some(source) = env_parse("TREASURY_FEED_SOURCE") {
            self.feed_source = source;
        }
        self.logging = self.logging.merge_env();
        self
    }

    /// Load the default config file if present, then apply the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path().filter(|p| p.exists()),
        };
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(base.merge_env())
    }

    /// Merge with another config; fields of `other` that differ from the
    /// defaults take precedence
    pub fn merge(mut self, other: Config) -> Self {
        let defaults = Config::default();
        if other.network != defaults.network {
            self.network = other.network;
        }
        if other.rpc_endpoint != defaults.rpc_endpoint {
            self.rpc_endpoint = other.rpc_endpoint;
        }
        if other.indexer_url != defaults.indexer_url {
            self.indexer_url = other.indexer_url;
        }
        if other.kyc_url != defaults.kyc_url {
            self.kyc_url = other.kyc_url;
        }
        if other.dao_id.is_some() {
            self.dao_id = other.dao_id;
        }
        if other.page_size != defaults.page_size {
            self.page_size = other.page_size;
        }
        if other.feed_source != defaults.feed_source {
            self.feed_source = other.feed_source;
        }
        if other.poll != defaults.poll {
            self.poll = other.poll;
        }
        if other.retry != defaults.retry {
            self.retry = other.retry;
        }
        if other.insufficient_balance_limit != defaults.insufficient_balance_limit {
            self.insufficient_balance_limit = other.insufficient_balance_limit;
        }
        if other.rate_limit_per_second != defaults.rate_limit_per_second {
            self.rate_limit_per_second = other.rate_limit_per_second;
        }
        if other.logging != defaults.logging {
            self.logging = other.logging;
        }
        self
    }

    /// Minimum voter balance as a token amount
    pub fn balance_limit(&self) -> Result<NearToken, ConfigError> {
        self.insufficient_balance_limit.parse().map_err(|e| {
            ConfigError::with_field(
                format!("'{}': {}", self.insufficient_balance_limit, e),
                "insufficient_balance_limit",
            )
        })
    }

    /// DAO account, required by every DAO command
    pub fn require_dao(&self) -> Result<&str, ConfigError> {
        self.dao_id.as_deref().ok_or_else(|| {
            ConfigError::with_field("no DAO configured; pass --dao or set TREASURY_DAO", "dao_id")
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll.into()
    }

    /// Check ranges and formats of every field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rpc_endpoint.starts_with("http://") && !self.rpc_endpoint.starts_with("https://") {
            return Err(ConfigError::with_field(
                format!("RPC endpoint '{}' must be an http(s) URL", self.rpc_endpoint),
                "rpc_endpoint",
            ));
        }
        if let Some(dao) = &self.dao_id {
            if !is_valid_account_id(dao) {
                return Err(ConfigError::with_field(
                    format!("'{}' is not a valid NEAR account id", dao),
                    "dao_id",
                ));
            }
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::with_field(
                format!("page size must be between 1 and {}", MAX_PAGE_SIZE),
                "page_size",
            ));
        }
        if self.feed_source == FeedSource::Indexer && self.indexer_url.is_none() {
            return Err(ConfigError::with_field(
                "feed source 'indexer' needs an indexer URL",
                "indexer_url",
            ));
        }
        if self.poll.interval_ms == 0 || self.poll.max_attempts == 0 || self.poll.timeout_secs == 0 {
            return Err(ConfigError::with_field(
                "poll interval, attempts and timeout must be positive",
                "poll",
            ));
        }
        if self.rate_limit_per_second == 0 {
            return Err(ConfigError::with_field(
                "rate limit must be positive",
                "rate_limit_per_second",
            ));
        }
        self.balance_limit()?;
        Ok(())
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
