use onesat_backend_client::BackendError;
use onesat_db::StoreError;
use onesat_primitives::DepositId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    #[error("pending store: {0}")]
    Store(#[from] StoreError),

    #[error("deposit {0} not found")]
    UnknownDeposit(DepositId),

    #[error("scheduler already started")]
    AlreadyStarted,
}
