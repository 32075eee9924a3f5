use bitcoin::Txid;
use onesat_primitives::DepositId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no pending record for deposit {0}")]
    UnknownDeposit(DepositId),

    #[error("pending record for deposit {0} already exists")]
    AlreadyExists(DepositId),

    /// The funding tx of a deposit is pinned once set.
    #[error("deposit {id} already has bitcoin tx {existing}, refusing {attempted}")]
    TxAlreadyPinned {
        id: DepositId,
        existing: Txid,
        attempted: Txid,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("unsupported store version {0}")]
    UnsupportedVersion(u32),
}
