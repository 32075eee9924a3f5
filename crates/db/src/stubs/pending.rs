use bitcoin::Txid;
use onesat_primitives::{DepositId, PendingDepositRecord};
use parking_lot::Mutex;

use crate::{
    ops::{self, RecordMap},
    traits::PendingDepositStore,
    DbResult,
};

/// In-memory store, lost on restart.
#[derive(Debug, Default)]
pub struct MemPendingStore {
    records: Mutex<RecordMap>,
}

impl MemPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingDepositStore for MemPendingStore {
    fn get(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>> {
        Ok(self.records.lock().get(id).cloned())
    }

    fn insert(&self, record: PendingDepositRecord) -> DbResult<()> {
        ops::insert(&mut self.records.lock(), record)
    }

    fn set_bitcoin_tx(&self, id: &DepositId, txid: Txid) -> DbResult<bool> {
        ops::set_bitcoin_tx(&mut self.records.lock(), id, txid)
    }

    fn set_swap_id(&self, id: &DepositId, swap_id: &str) -> DbResult<bool> {
        ops::set_swap_id(&mut self.records.lock(), id, swap_id)
    }

    fn remove(&self, id: &DepositId) -> DbResult<Option<PendingDepositRecord>> {
        Ok(self.records.lock().remove(id))
    }

    fn list(&self) -> DbResult<Vec<PendingDepositRecord>> {
        Ok(self.records.lock().values().cloned().collect())
    }
}
