use std::path::PathBuf;

use onesat_primitives::ExplorerNetwork;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ConfigError,
    polling::{PolicyConfig, PollingConfig},
};

/// Default value for `request_timeout_ms` of the HTTP clients.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Default value for `max_retries` in [`ExplorerConfig`].
const DEFAULT_EXPLORER_MAX_RETRIES: u8 = 3;

/// Default value for `retry_interval_ms` in [`ExplorerConfig`].
const DEFAULT_EXPLORER_RETRY_INTERVAL_MS: u64 = 1_000;

/// Default value for `path` in [`StoreConfig`].
const DEFAULT_STORE_PATH: &str = "onesat-data/pending.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Root URL of the deposit backend.
    pub url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    #[serde(default)]
    pub network: ExplorerNetwork,

    /// Overrides the public explorer for `network`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_explorer_max_retries")]
    pub max_retries: u8,

    #[serde(default = "default_explorer_retry_interval_ms")]
    pub retry_interval_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            network: ExplorerNetwork::default(),
            base_url: None,
            max_retries: DEFAULT_EXPLORER_MAX_RETRIES,
            retry_interval_ms: DEFAULT_EXPLORER_RETRY_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTrackerConfig {
    /// Root URL of the swap tracking service.
    pub url: String,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// File holding the locally initiated deposits.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_explorer_max_retries() -> u8 {
    DEFAULT_EXPLORER_MAX_RETRIES
}

fn default_explorer_retry_interval_ms() -> u64 {
    DEFAULT_EXPLORER_RETRY_INTERVAL_MS
}

fn default_store_path() -> PathBuf {
    DEFAULT_STORE_PATH.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,

    #[serde(default)]
    pub explorer: ExplorerConfig,

    pub swap_tracker: SwapTrackerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

impl Config {
    /// Checks the values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("backend.url"));
        }
        if self.swap_tracker.url.trim().is_empty() {
            return Err(ConfigError::EmptyUrl("swap_tracker.url"));
        }
        if self.explorer.base_url.is_none() && self.explorer.network.default_base_url().is_none() {
            return Err(ConfigError::MissingExplorerUrl(
                self.explorer.network.to_string(),
            ));
        }
        if self.explorer.max_retries == 0 {
            return Err(ConfigError::Zero("explorer.max_retries"));
        }

        let positive = [
            (
                self.polling.background_interval_ms,
                "polling.background_interval_ms",
            ),
            (self.polling.focused_interval_ms, "polling.focused_interval_ms"),
            (self.policy.redeem_confirmations, "policy.redeem_confirmations"),
            (self.policy.expiry_secs, "policy.expiry_secs"),
        ];
        for (value, name) in positive {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }

        Ok(())
    }
}
