//! Storage interface for pending deposit records.

use bitcoin::Txid;
use onesat_primitives::{DepositId, PendingDepositRecord};

use crate::DbResult;

/// Process-wide table of deposits this client initiated, keyed by deposit id.
///
/// Records are never removed implicitly. Implementations must be safe to
/// share between the polling tasks and the command surface.
#[cfg_attr(feature = "mocks", mockall::automock)]
pub trait PendingDepositStore: Send + Sync + 'static {
    fn get(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>>;

    /// Adds a new record. Fails if one already exists for the id.
    fn insert(&self, record: PendingDepositRecord) -> DbResult<()>;

    /// Records the funding tx of a deposit.
    ///
    /// Returns whether anything changed. Setting the same txid again is a
    /// no-op, a different one is rejected.
    fn set_bitcoin_tx(&self, id: &DepositId, txid: Txid) -> DbResult<bool>;

    /// Fills in the swap id if the record has none yet. Returns whether
    /// anything changed.
    fn set_swap_id(&self, id: &DepositId, swap_id: &str) -> DbResult<bool>;

    /// Explicitly forgets a record.
    fn remove(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>>;

    fn list(&self) -> DbResult<Vec<PendingDepositRecord>>;
}
