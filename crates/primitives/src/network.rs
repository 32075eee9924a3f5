use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Bitcoin network an explorer serves.
///
/// Kept separate from [`bitcoin::Network`] because public explorers
/// distinguish testnet3 from testnet4 by URL path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplorerNetwork {
    Mainnet,
    Testnet,
    #[default]
    Testnet4,
    Signet,
    Regtest,
}

impl ExplorerNetwork {
    /// Public mempool.space API root for this network, if one exists.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ExplorerNetwork::Mainnet => Some("https://mempool.space/api"),
            ExplorerNetwork::Testnet => Some("https://mempool.space/testnet/api"),
            ExplorerNetwork::Testnet4 => Some("https://mempool.space/testnet4/api"),
            ExplorerNetwork::Signet => Some("https://mempool.space/signet/api"),
            ExplorerNetwork::Regtest => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExplorerNetwork::Mainnet => "mainnet",
            ExplorerNetwork::Testnet => "testnet",
            ExplorerNetwork::Testnet4 => "testnet4",
            ExplorerNetwork::Signet => "signet",
            ExplorerNetwork::Regtest => "regtest",
        }
    }
}

impl fmt::Display for ExplorerNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplorerNetwork {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "bitcoin" => Ok(ExplorerNetwork::Mainnet),
            "testnet" | "testnet3" => Ok(ExplorerNetwork::Testnet),
            "testnet4" => Ok(ExplorerNetwork::Testnet4),
            "signet" => Ok(ExplorerNetwork::Signet),
            "regtest" => Ok(ExplorerNetwork::Regtest),
            _ => Err(ParseError::UnknownNetwork(s.to_string())),
        }
    }
}
