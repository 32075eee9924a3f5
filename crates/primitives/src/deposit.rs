//! Backend-owned deposit records.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Length in bytes of a deposit identifier.
pub const DEPOSIT_ID_LEN: usize = 32;

/// Identifier of a deposit, 32 bytes as lowercase hex.
///
/// The backend accepts ids with or without a `0x` prefix, so both forms parse
/// to the same value. The canonical form is stored without the prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepositId(String);

impl DepositId {
    /// Returns the canonical hex string, without `0x` prefix.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl FromStr for DepositId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(hex_part).map_err(|_| ParseError::InvalidHex(s.to_string()))?;
        if bytes.len() != DEPOSIT_ID_LEN {
            return Err(ParseError::InvalidLength(bytes.len()));
        }

        Ok(Self(hex::encode(bytes)))
    }
}

impl TryFrom<String> for DepositId {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DepositId> for String {
    fn from(value: DepositId) -> Self {
        format!("0x{}", value.0)
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

/// Status of a deposit as recorded by the backend.
///
/// Variants are declared in lifecycle order, so `Ord` follows progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// Deposit request registered, nothing funded yet.
    Created,
    /// The backend saw the swap being initiated.
    Initiated,
    /// Funds landed in the destination position.
    Deposited,
}

impl DepositStatus {
    /// Whether the backend considers the deposit finished.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepositStatus::Deposited)
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DepositStatus::Created => "created",
            DepositStatus::Initiated => "initiated",
            DepositStatus::Deposited => "deposited",
        };
        f.write_str(s)
    }
}

/// Kind of operation a deposit record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub enum DepositAction {
    Deposit,
    Withdraw,
    Unknown(u64),
}

impl From<u64> for DepositAction {
    fn from(value: u64) -> Self {
        match value {
            1 => DepositAction::Deposit,
            2 => DepositAction::Withdraw,
            other => DepositAction::Unknown(other),
        }
    }
}

impl From<DepositAction> for u64 {
    fn from(value: DepositAction) -> Self {
        match value {
            DepositAction::Deposit => 1,
            DepositAction::Withdraw => 2,
            DepositAction::Unknown(other) => other,
        }
    }
}

/// Deposit entity as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    #[serde(rename = "deposit_id", alias = "id")]
    pub id: DepositId,

    #[serde(rename = "user_address", alias = "owner_address")]
    pub owner_address: String,

    pub action: DepositAction,

    /// Decimal amount, kept as a string to avoid float rounding.
    pub amount: String,

    pub token: String,

    pub target_address: String,

    pub deposit_address: String,

    pub status: DepositStatus,

    pub created_at: DateTime<Utc>,

    /// Identifier of the cross-chain swap funding this deposit, once known.
    #[serde(default, rename = "atomiq_swap_id", alias = "swap_id")]
    pub swap_id: Option<String>,

    /// Destination-chain transaction. This is never the Bitcoin funding tx.
    #[serde(default, rename = "deposit_tx_hash")]
    pub destination_tx_hash: Option<String>,
}

impl Deposit {
    /// Returns the swap id if the backend has recorded a non-empty one.
    pub fn swap_id(&self) -> Option<&str> {
        self.swap_id.as_deref().filter(|s| !s.trim().is_empty())
    }
}
