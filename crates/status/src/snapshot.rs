use std::{collections::BTreeMap, fmt};

use bitcoin::Txid;
use onesat_primitives::{DepositId, DepositStatus, EffectiveStatus};
use serde::Serialize;

/// State of the swap tracker session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverStatus {
    #[default]
    Initializing,
    Ready,
    /// Init failed, lookups are unavailable for the rest of the session.
    Failed,
    Stopped,
}

impl ResolverStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResolverStatus::Ready)
    }

    /// Whether initialization has finished one way or another.
    pub fn is_settled(&self) -> bool {
        !matches!(self, ResolverStatus::Initializing)
    }
}

impl fmt::Display for ResolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolverStatus::Initializing => "initializing",
            ResolverStatus::Ready => "ready",
            ResolverStatus::Failed => "failed",
            ResolverStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// What the engine currently believes about one deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositView {
    pub status: EffectiveStatus,
    pub backend_status: DepositStatus,
    pub tx_id: Option<Txid>,
    pub confirmations: u64,
}

/// Statuses of every tracked deposit after the latest sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub deposits: BTreeMap<DepositId, DepositView>,

    /// Bumped by every publish that changed at least one view, whether it
    /// came from a background sweep or a focused poll.
    pub revision: u64,
}

impl StatusSnapshot {
    pub fn status_of(&self, id: &DepositId) -> Option<EffectiveStatus> {
        self.deposits.get(id).map(|v| v.status)
    }
}

/// Effective status change of one deposit between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTransition {
    pub id: DepositId,
    pub from: Option<EffectiveStatus>,
    pub to: EffectiveStatus,
}
