use bitcoin::{BlockHash, Txid};
use serde::Deserialize;

/// Subset of the esplora `GET /tx/{txid}` response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EsploraTx {
    pub txid: Txid,
    pub status: EsploraTxStatus,
}

/// Confirmation status of an esplora transaction.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EsploraTxStatus {
    pub confirmed: bool,

    #[serde(default)]
    pub block_height: Option<u64>,

    #[serde(default)]
    pub block_hash: Option<BlockHash>,

    #[serde(default)]
    pub block_time: Option<u64>,
}

impl EsploraTxStatus {
    /// Inclusion height, only meaningful when confirmed.
    pub fn included_height(&self) -> Option<u64> {
        if self.confirmed {
            self.block_height
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmed() {
        let json = r#"{
            "txid": "c3a4b2a8e0c9d2f0b8a7e6d5c4b3a29180f7e6d5c4b3a29180f7e6d5c4b3a291",
            "version": 2,
            "locktime": 0,
            "status": {
                "confirmed": true,
                "block_height": 61203,
                "block_hash": "00000000000000000001c4a2e5e8c5f7bfa8fa1c4c0c1e9e5a9b6b0f2b8c1d3e",
                "block_time": 1730000000
            }
        }"#;
        let tx: EsploraTx = serde_json::from_str(json).unwrap();
        assert_eq!(tx.status.included_height(), Some(61203));
    }

    #[test]
    fn test_parse_mempool() {
        let json = r#"{
            "txid": "c3a4b2a8e0c9d2f0b8a7e6d5c4b3a29180f7e6d5c4b3a29180f7e6d5c4b3a291",
            "status": { "confirmed": false }
        }"#;
        let tx: EsploraTx = serde_json::from_str(json).unwrap();
        assert!(!tx.status.confirmed);
        assert_eq!(tx.status.included_height(), None);
    }
}
