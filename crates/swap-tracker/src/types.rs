use bitcoin::Txid;
use serde::{Deserialize, Serialize};

/// A swap as reported by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    pub id: String,

    /// Tracker-specific state code.
    #[serde(default)]
    pub state: Option<i64>,

    #[serde(default, alias = "btc_tx_id", alias = "input_tx_id")]
    source_tx_id: Option<String>,
}

impl SwapRecord {
    pub fn new(id: impl Into<String>, source_tx_id: Option<Txid>) -> Self {
        Self {
            id: id.into(),
            state: None,
            source_tx_id: source_tx_id.map(|t| t.to_string()),
        }
    }

    /// Bitcoin transaction that funded the swap, once the tracker has seen
    /// it. Unparseable values are treated as not yet known.
    pub fn source_tx_id(&self) -> Option<Txid> {
        self.source_tx_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}
