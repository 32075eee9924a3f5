//! Client-owned records of deposits submitted from this machine.

use bitcoin::Txid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::deposit::DepositId;

/// A deposit this client initiated.
///
/// Only a same-device hint: another device never sees these, and the backend
/// remains the source of truth for everything except the Bitcoin txid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDepositRecord {
    pub deposit_id: DepositId,

    /// Funding transaction, set once the wallet broadcasts it.
    #[serde(default)]
    pub bitcoin_tx_id: Option<Txid>,

    /// Swap id, if known locally before the backend recorded it.
    #[serde(default)]
    pub swap_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PendingDepositRecord {
    pub fn new(deposit_id: DepositId, created_at: DateTime<Utc>) -> Self {
        Self {
            deposit_id,
            bitcoin_tx_id: None,
            swap_id: None,
            created_at,
        }
    }

    pub fn with_bitcoin_tx(mut self, txid: Txid) -> Self {
        self.bitcoin_tx_id = Some(txid);
        self
    }

    pub fn with_swap_id(mut self, swap_id: impl Into<String>) -> Self {
        self.swap_id = Some(swap_id.into());
        self
    }
}
