use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default value for `background_interval_ms` in [`PollingConfig`].
const DEFAULT_BACKGROUND_INTERVAL_MS: u64 = 10_000;

/// Default value for `focused_interval_ms` in [`PollingConfig`].
const DEFAULT_FOCUSED_INTERVAL_MS: u64 = 5_000;

/// Default value for `cache_ttl_ms` in [`PollingConfig`].
const DEFAULT_CACHE_TTL_MS: u64 = 10_000;

/// Default value for `shutdown_timeout_ms` in [`PollingConfig`].
const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 2_000;

/// Default value for `expiry_secs` in [`PolicyConfig`], 24 hours.
const DEFAULT_EXPIRY_SECS: u64 = 24 * 60 * 60;

/// Default value for `redeem_confirmations` in [`PolicyConfig`].
const DEFAULT_REDEEM_CONFIRMATIONS: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Time between background sweeps over every open deposit, in millis.
    #[serde(default = "default_background_interval_ms")]
    pub background_interval_ms: u64,

    /// Time between polls of the focused deposit, in millis.
    #[serde(default = "default_focused_interval_ms")]
    pub focused_interval_ms: u64,

    /// How long a blockchain cache entry stays fresh, in millis.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// How long tasks get to wind down on stop, in millis.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl PollingConfig {
    pub fn background_interval(&self) -> Duration {
        Duration::from_millis(self.background_interval_ms)
    }

    pub fn focused_interval(&self) -> Duration {
        Duration::from_millis(self.focused_interval_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            background_interval_ms: DEFAULT_BACKGROUND_INTERVAL_MS,
            focused_interval_ms: DEFAULT_FOCUSED_INTERVAL_MS,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            shutdown_timeout_ms: DEFAULT_SHUTDOWN_TIMEOUT_MS,
        }
    }
}

fn default_background_interval_ms() -> u64 {
    DEFAULT_BACKGROUND_INTERVAL_MS
}

fn default_focused_interval_ms() -> u64 {
    DEFAULT_FOCUSED_INTERVAL_MS
}

fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL_MS
}

fn default_shutdown_timeout_ms() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_MS
}

/// Thresholds used when deriving statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Age after which an unfunded `created` deposit is expired, in seconds.
    #[serde(default = "default_expiry_secs")]
    pub expiry_secs: u64,

    /// Confirmations at which a funding tx counts as redeemed.
    #[serde(default = "default_redeem_confirmations")]
    pub redeem_confirmations: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            expiry_secs: DEFAULT_EXPIRY_SECS,
            redeem_confirmations: DEFAULT_REDEEM_CONFIRMATIONS,
        }
    }
}

fn default_expiry_secs() -> u64 {
    DEFAULT_EXPIRY_SECS
}

fn default_redeem_confirmations() -> u64 {
    DEFAULT_REDEEM_CONFIRMATIONS
}
