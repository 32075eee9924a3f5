//! Bringing one cache entry up to date.

use std::time::Duration;

use bitcoin::Txid;
use onesat_btcio::{confirmations, BlockExplorer};
use onesat_db::PendingDepositStore;
use onesat_primitives::{Deposit, DepositStatus};
use onesat_swap_tracker::SwapTracker;
use tracing::*;

use crate::{cache::BlockchainDataCache, clock::Now};

/// Outcome of looking up the funding tx of a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolved {
    Found(Txid),
    NotYet,
    /// A lookup that could have answered failed.
    LookupFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TipState {
    Unfetched,
    Fetched(u64),
    Failed,
}

/// Shared state of one pass over a set of deposits.
///
/// The chain tip is fetched lazily, at most once per pass, and only if some
/// deposit actually has a tx to measure.
pub(crate) struct SweepContext<'a> {
    explorer: &'a dyn BlockExplorer,
    tracker: &'a dyn SwapTracker,
    store: &'a dyn PendingDepositStore,
    cache: &'a BlockchainDataCache,
    resolver_ready: bool,
    now: Now,
    ttl: Duration,
    bypass_ttl: bool,
    tip: TipState,
}

/// What refreshing one deposit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshOutcome {
    /// The backend already reports the deposit complete.
    SkippedTerminal,
    /// Checked recently enough.
    SkippedFresh,
    Checked { changed: bool },
    /// A lookup failed, the entry is left for the next pass.
    Failed,
}

impl<'a> SweepContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        explorer: &'a dyn BlockExplorer,
        tracker: &'a dyn SwapTracker,
        store: &'a dyn PendingDepositStore,
        cache: &'a BlockchainDataCache,
        resolver_ready: bool,
        now: Now,
        ttl: Duration,
        bypass_ttl: bool,
    ) -> Self {
        Self {
            explorer,
            tracker,
            store,
            cache,
            resolver_ready,
            now,
            ttl,
            bypass_ttl,
            tip: TipState::Unfetched,
        }
    }

    async fn tip_height(&mut self) -> Option<u64> {
        match self.tip {
            TipState::Fetched(h) => Some(h),
            TipState::Failed => None,
            TipState::Unfetched => match self.explorer.tip_height().await {
                Ok(h) => {
                    trace!(tip = h, "fetched chain tip");
                    self.tip = TipState::Fetched(h);
                    Some(h)
                }
                Err(e) => {
                    warn!(err = %e, "could not fetch chain tip");
                    self.tip = TipState::Failed;
                    None
                }
            },
        }
    }

    /// Finds the funding tx: cache first, then the local pending record,
    /// then the swap tracker.
    async fn resolve_tx(&self, deposit: &Deposit) -> Resolved {
        if let Some(txid) = self.cache.get(&deposit.id).and_then(|e| e.resolved_tx_id) {
            return Resolved::Found(txid);
        }

        let pending = match self.store.get(&deposit.id) {
            Ok(rec) => rec,
            Err(e) => {
                warn!(deposit_id = %deposit.id, err = %e, "could not read pending record");
                None
            }
        };
        if let Some(txid) = pending.as_ref().and_then(|p| p.bitcoin_tx_id) {
            return Resolved::Found(txid);
        }

        if !self.resolver_ready {
            return Resolved::NotYet;
        }

        let swap_id = deposit
            .swap_id()
            .or_else(|| pending.as_ref().and_then(|p| p.swap_id.as_deref()));
        let Some(swap_id) = swap_id else {
            return Resolved::NotYet;
        };

        match self.tracker.swap_by_id(swap_id).await {
            Ok(swap) => match swap.and_then(|s| s.source_tx_id()) {
                Some(txid) => Resolved::Found(txid),
                None => Resolved::NotYet,
            },
            Err(e) => {
                warn!(deposit_id = %deposit.id, %swap_id, err = %e, "swap lookup failed");
                Resolved::LookupFailed
            }
        }
    }

    /// Refreshes the cache entry of one deposit. Never fails, lookup errors
    /// are logged and leave the entry as it was.
    pub(crate) async fn refresh(&mut self, deposit: &Deposit) -> RefreshOutcome {
        let id = &deposit.id;

        if deposit.status == DepositStatus::Deposited {
            return RefreshOutcome::SkippedTerminal;
        }

        if !self.bypass_ttl
            && self
                .cache
                .get(id)
                .is_some_and(|e| e.is_fresh(self.now.at, self.ttl))
        {
            return RefreshOutcome::SkippedFresh;
        }

        let txid = match self.resolve_tx(deposit).await {
            Resolved::Found(txid) => txid,
            Resolved::NotYet => {
                let changed = self.cache.record_check(id, None, 0, self.now.at);
                return RefreshOutcome::Checked { changed };
            }
            Resolved::LookupFailed => {
                self.cache.ensure(id);
                return RefreshOutcome::Failed;
            }
        };

        // the tx id is ours from here on, even if measuring it fails
        self.cache.pin_tx(id, txid);

        let Some(tip) = self.tip_height().await else {
            return RefreshOutcome::Failed;
        };

        let included = match self.explorer.tx_block_height(&txid).await {
            Ok(h) => h,
            Err(e) => {
                warn!(deposit_id = %id, %txid, err = %e, "could not fetch tx status");
                return RefreshOutcome::Failed;
            }
        };

        let confs = confirmations(tip, included);
        let changed = self.cache.record_check(id, Some(txid), confs, self.now.at);
        if changed {
            debug!(deposit_id = %id, %txid, confirmations = confs, "chain data updated");
        }
        RefreshOutcome::Checked { changed }
    }
}
