//! Derived deposit statuses and their progress projection.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a deposit after reconciling every data source.
///
/// Never persisted, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    /// Registered with the backend, no Bitcoin transaction seen yet.
    Created,
    /// The swap tracker is still starting up, so "nothing seen" is not
    /// trustworthy yet.
    Checking,
    /// A Bitcoin funding transaction is known but not sufficiently confirmed.
    Initiated,
    /// The funding transaction reached the redeem confirmation threshold.
    Redeemed,
    /// The backend reports the destination deposit complete.
    Deposited,
    /// Created but never funded within the expiry window.
    Expired,
}

impl EffectiveStatus {
    /// Terminal statuses never need another network round trip.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EffectiveStatus::Deposited | EffectiveStatus::Expired)
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectiveStatus::Created => "created",
            EffectiveStatus::Checking => "checking",
            EffectiveStatus::Initiated => "initiated",
            EffectiveStatus::Redeemed => "redeemed",
            EffectiveStatus::Deposited => "deposited",
            EffectiveStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// One of the four ordered steps shown to the user, or the frozen expired
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    /// Step 0: deposit submitted.
    Submitted,
    /// Step 1: BTC detected.
    BtcDetected,
    /// Step 2: funding transaction confirmed and redeemed.
    Redeemed,
    /// Step 3: success.
    Success,
    /// Not a numbered step.
    Expired,
}

impl ProgressStage {
    /// Numeric step index, `None` for [`ProgressStage::Expired`].
    pub fn index(&self) -> Option<u8> {
        match self {
            ProgressStage::Submitted => Some(0),
            ProgressStage::BtcDetected => Some(1),
            ProgressStage::Redeemed => Some(2),
            ProgressStage::Success => Some(3),
            ProgressStage::Expired => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressStage::Submitted => "deposit submitted",
            ProgressStage::BtcDetected => "BTC detected",
            ProgressStage::Redeemed => "converted and deposited in vault",
            ProgressStage::Success => "success",
            ProgressStage::Expired => "expired",
        }
    }
}

impl From<EffectiveStatus> for ProgressStage {
    fn from(status: EffectiveStatus) -> Self {
        match status {
            EffectiveStatus::Created | EffectiveStatus::Checking => ProgressStage::Submitted,
            EffectiveStatus::Initiated => ProgressStage::BtcDetected,
            EffectiveStatus::Redeemed => ProgressStage::Redeemed,
            EffectiveStatus::Deposited => ProgressStage::Success,
            EffectiveStatus::Expired => ProgressStage::Expired,
        }
    }
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{}/3 ({})", i, self.label()),
            None => f.write_str(self.label()),
        }
    }
}
