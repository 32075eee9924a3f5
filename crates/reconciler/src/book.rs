//! Backend records a session currently tracks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use onesat_db::PendingDepositStore;
use onesat_primitives::{Deposit, DepositId, DepositStatus};
use parking_lot::RwLock;
use tracing::*;

use crate::policy::StatusPolicy;

/// Latest accepted backend record per deposit.
///
/// The backend status only moves forward here: a re-fetched record whose
/// status is behind the one already seen (a stale replica answering) is
/// dropped.
#[derive(Debug, Default)]
pub struct DepositBook {
    deposits: RwLock<BTreeMap<DepositId, Deposit>>,
}

impl DepositBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a fetched record unless it would move the status backwards.
    /// Returns whether the record was accepted.
    pub fn upsert(&self, deposit: Deposit) -> bool {
        let mut deposits = self.deposits.write();
        if let Some(known) = deposits.get(&deposit.id) {
            if deposit.status < known.status {
                debug!(deposit_id = %deposit.id, known = %known.status, fetched = %deposit.status, "ignoring stale backend record");
                return false;
            }
        }
        deposits.insert(deposit.id.clone(), deposit);
        true
    }

    pub fn get(&self, id: &DepositId) -> Option<Deposit> {
        self.deposits.read().get(id).cloned()
    }

    pub fn contains(&self, id: &DepositId) -> bool {
        self.deposits.read().contains_key(id)
    }

    pub fn ids(&self) -> Vec<DepositId> {
        self.deposits.read().keys().cloned().collect()
    }

    pub fn all(&self) -> Vec<Deposit> {
        self.deposits.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.deposits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deposits.read().is_empty()
    }

    /// Stops tracking everything `keep` rejects.
    pub fn retain(&self, keep: impl Fn(&DepositId) -> bool) {
        self.deposits.write().retain(|id, _| keep(id));
    }
}

/// Deposits still worth showing as in flight: `created` within the expiry
/// window, or `initiated`.
pub fn open_deposits(deposits: &[Deposit], policy: &StatusPolicy, now: DateTime<Utc>) -> Vec<Deposit> {
    deposits
        .iter()
        .filter(|d| match d.status {
            DepositStatus::Created => now - d.created_at <= policy.expiry,
            DepositStatus::Initiated => true,
            DepositStatus::Deposited => false,
        })
        .cloned()
        .collect()
}

/// Fills swap ids the backend knows into local pending records that lack
/// one. Bitcoin tx ids are never touched. Returns how many records changed.
pub fn merge_pending(store: &dyn PendingDepositStore, deposits: &[Deposit]) -> usize {
    let mut merged = 0;
    for deposit in deposits {
        let Some(swap_id) = deposit.swap_id() else {
            continue;
        };

        match store.get(&deposit.id) {
            Ok(Some(rec)) if rec.swap_id.is_none() => match store.set_swap_id(&deposit.id, swap_id) {
                Ok(true) => merged += 1,
                Ok(false) => {}
                Err(e) => warn!(deposit_id = %deposit.id, err = %e, "could not merge swap id"),
            },
            Ok(_) => {}
            Err(e) => warn!(deposit_id = %deposit.id, err = %e, "could not read pending record"),
        }
    }

    if merged > 0 {
        debug!(%merged, "merged backend swap ids into pending store");
    }
    merged
}
