use chrono::TimeDelta;
use onesat_config::PolicyConfig;

/// Thresholds applied by [`derive_status`](crate::derive_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolicy {
    /// Age after which an unfunded `created` deposit is expired.
    pub expiry: TimeDelta,

    /// Confirmations at which the funding tx counts as redeemed.
    pub redeem_confirmations: u64,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self {
            expiry: TimeDelta::hours(24),
            redeem_confirmations: 2,
        }
    }
}

impl From<&PolicyConfig> for StatusPolicy {
    fn from(config: &PolicyConfig) -> Self {
        let secs = i64::try_from(config.expiry_secs).unwrap_or(i64::MAX);
        Self {
            expiry: TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX),
            redeem_confirmations: config.redeem_confirmations,
        }
    }
}
