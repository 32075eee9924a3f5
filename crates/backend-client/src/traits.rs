use async_trait::async_trait;
use onesat_primitives::{Deposit, DepositId};

use crate::errors::BackendError;

/// Read access to the backend's deposit records.
#[async_trait]
pub trait DepositApi: Send + Sync + 'static {
    /// Fetches one deposit, `None` if the backend does not know it.
    async fn deposit(&self, id: &DepositId) -> Result<Option<Deposit>, BackendError>;

    /// Full deposit history of an owner address.
    async fn deposits_by_owner(&self, owner: &str) -> Result<Vec<Deposit>, BackendError>;

    /// Every deposit still in the `created` state.
    async fn created_deposits(&self) -> Result<Vec<Deposit>, BackendError>;
}
