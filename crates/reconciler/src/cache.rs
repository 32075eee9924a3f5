//! Per-deposit blockchain data, shared by every view of a session.

use std::{collections::HashMap, time::Duration};

use bitcoin::Txid;
use onesat_primitives::DepositId;
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::*;

/// What the chain says about one deposit's funding transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub deposit_id: DepositId,

    /// Funding tx, pinned once known.
    pub resolved_tx_id: Option<Txid>,

    /// Confirmations of `resolved_tx_id`, never decreasing.
    pub confirmations: u64,

    /// Start of the last sweep that completed a check, `None` while every
    /// attempt so far failed.
    pub last_checked: Option<Instant>,
}

impl CacheEntry {
    fn empty(deposit_id: DepositId) -> Self {
        Self {
            deposit_id,
            resolved_tx_id: None,
            confirmations: 0,
            last_checked: None,
        }
    }

    /// Whether the entry was checked less than `ttl` before `now`.
    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.last_checked
            .is_some_and(|t| now.saturating_duration_since(t) < ttl)
    }
}

/// In-memory map deposit id -> [`CacheEntry`], discarded with the session.
///
/// Anyone can read. Only the refresh path writes, and writes are monotonic:
/// a tx id never goes back to `None` or changes, confirmations never
/// decrease.
#[derive(Debug, Default)]
pub struct BlockchainDataCache {
    entries: RwLock<HashMap<DepositId, CacheEntry>>,
}

impl BlockchainDataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &DepositId) -> Option<CacheEntry> {
        self.entries.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Makes sure an entry exists, recording "no data yet".
    pub(crate) fn ensure(&self, id: &DepositId) {
        self.entries
            .write()
            .entry(id.clone())
            .or_insert_with(|| CacheEntry::empty(id.clone()));
    }

    /// Pins the tx id without recording a completed check. Returns whether
    /// the entry changed.
    pub(crate) fn pin_tx(&self, id: &DepositId, txid: Txid) -> bool {
        let mut entries = self.entries.write();
        let entry = entries
            .entry(id.clone())
            .or_insert_with(|| CacheEntry::empty(id.clone()));
        Self::apply_tx(entry, txid)
    }

    /// Records a completed check made at `checked_at`.
    ///
    /// Returns whether the tx id or the confirmations changed. The check time
    /// is stamped either way.
    pub(crate) fn record_check(
        &self,
        id: &DepositId,
        txid: Option<Txid>,
        confirmations: u64,
        checked_at: Instant,
    ) -> bool {
        let mut entries = self.entries.write();
        let mut changed = !entries.contains_key(id);
        let entry = entries
            .entry(id.clone())
            .or_insert_with(|| CacheEntry::empty(id.clone()));

        entry.last_checked = Some(checked_at);

        let Some(txid) = txid else {
            return changed;
        };

        changed |= Self::apply_tx(entry, txid);
        if entry.resolved_tx_id != Some(txid) {
            // confirmations of some other tx, don't mix them in
            return changed;
        }

        if confirmations > entry.confirmations {
            entry.confirmations = confirmations;
            changed = true;
        } else if confirmations < entry.confirmations {
            trace!(deposit_id = %id, %txid, old = entry.confirmations, new = confirmations, "ignoring confirmation drop");
        }
        changed
    }

    fn apply_tx(entry: &mut CacheEntry, txid: Txid) -> bool {
        match entry.resolved_tx_id {
            None => {
                entry.resolved_tx_id = Some(txid);
                true
            }
            Some(pinned) if pinned == txid => false,
            Some(pinned) => {
                warn!(deposit_id = %entry.deposit_id, %pinned, %txid, "conflicting funding tx, keeping pinned one");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{id, txid};

    #[test]
    fn test_tx_pinned_for_session() {
        let cache = BlockchainDataCache::new();
        let t0 = Instant::now();

        assert!(cache.record_check(&id(1), Some(txid(1)), 0, t0));
        assert!(!cache.record_check(&id(1), None, 0, t0));
        assert!(!cache.record_check(&id(1), Some(txid(2)), 5, t0));

        let entry = cache.get(&id(1)).unwrap();
        assert_eq!(entry.resolved_tx_id, Some(txid(1)));
        assert_eq!(entry.confirmations, 0);
    }

    #[test]
    fn test_confirmations_sticky_upward() {
        let cache = BlockchainDataCache::new();
        let t0 = Instant::now();

        cache.record_check(&id(1), Some(txid(1)), 3, t0);
        // explorer backend lagging behind
        assert!(!cache.record_check(&id(1), Some(txid(1)), 1, t0));
        assert_eq!(cache.get(&id(1)).unwrap().confirmations, 3);

        assert!(cache.record_check(&id(1), Some(txid(1)), 4, t0));
        assert_eq!(cache.get(&id(1)).unwrap().confirmations, 4);
    }

    #[test]
    fn test_freshness() {
        let cache = BlockchainDataCache::new();
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);

        cache.ensure(&id(1));
        assert!(!cache.get(&id(1)).unwrap().is_fresh(t0, ttl));

        cache.record_check(&id(1), None, 0, t0);
        let entry = cache.get(&id(1)).unwrap();
        assert!(entry.is_fresh(t0 + Duration::from_secs(9), ttl));
        assert!(!entry.is_fresh(t0 + Duration::from_secs(10), ttl));
    }

    #[test]
    fn test_pin_does_not_stamp() {
        let cache = BlockchainDataCache::new();
        assert!(cache.pin_tx(&id(1), txid(1)));
        assert!(!cache.pin_tx(&id(1), txid(1)));

        let entry = cache.get(&id(1)).unwrap();
        assert_eq!(entry.last_checked, None);
        assert_eq!(entry.resolved_tx_id, Some(txid(1)));
    }
}
