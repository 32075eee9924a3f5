//! Everything one tracking session owns.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use onesat_backend_client::{BackendError, DepositApi};
use onesat_btcio::BlockExplorer;
use onesat_config::PollingConfig;
use onesat_db::PendingDepositStore;
use onesat_primitives::{Deposit, DepositId, DepositStatus, EffectiveStatus, PendingDepositRecord};
use onesat_status::{DepositView, ResolverStatus, StatusChannel, StatusTransition};
use onesat_swap_tracker::SwapTracker;
use tracing::*;

use crate::{
    book::{self, DepositBook},
    cache::BlockchainDataCache,
    clock::Now,
    derive::derive_status,
    errors::TrackerError,
    policy::StatusPolicy,
    refresh::{RefreshOutcome, SweepContext},
};

/// Session state: the external services, the deposits being tracked, the
/// chain data cache and the published statuses.
///
/// Constructed once per view and passed around explicitly. The cache can be
/// shared with other sessions through [`TrackerSession::with_cache`].
pub struct TrackerSession {
    api: Arc<dyn DepositApi>,
    explorer: Arc<dyn BlockExplorer>,
    tracker: Arc<dyn SwapTracker>,
    store: Arc<dyn PendingDepositStore>,
    cache: Arc<BlockchainDataCache>,
    book: DepositBook,
    status: StatusChannel,
    policy: StatusPolicy,
    polling: PollingConfig,
}

impl TrackerSession {
    pub fn new(
        api: Arc<dyn DepositApi>,
        explorer: Arc<dyn BlockExplorer>,
        tracker: Arc<dyn SwapTracker>,
        store: Arc<dyn PendingDepositStore>,
        policy: StatusPolicy,
        polling: PollingConfig,
    ) -> Self {
        Self {
            api,
            explorer,
            tracker,
            store,
            cache: Arc::new(BlockchainDataCache::new()),
            book: DepositBook::new(),
            status: StatusChannel::new(),
            policy,
            polling,
        }
    }

    /// Uses an existing cache instead of a fresh one.
    pub fn with_cache(mut self, cache: Arc<BlockchainDataCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<BlockchainDataCache> {
        &self.cache
    }

    pub fn book(&self) -> &DepositBook {
        &self.book
    }

    pub fn status_channel(&self) -> &StatusChannel {
        &self.status
    }

    pub fn policy(&self) -> &StatusPolicy {
        &self.policy
    }

    pub fn polling(&self) -> &PollingConfig {
        &self.polling
    }

    pub fn store(&self) -> &Arc<dyn PendingDepositStore> {
        &self.store
    }

    pub fn resolver_status(&self) -> ResolverStatus {
        self.status.get_resolver_status()
    }

    fn resolver_ready(&self) -> bool {
        self.resolver_status().is_ready()
    }

    /// Runs the one-time swap tracker setup of this session.
    ///
    /// A failure is final for the session: `created` deposits without a
    /// known tx stay `checking`.
    pub async fn init_resolver(&self) -> ResolverStatus {
        debug!("initializing swap tracker");
        let outcome = match self.tracker.init().await {
            Ok(()) => ResolverStatus::Ready,
            Err(e) => {
                warn!(err = %e, "swap tracker init failed, lookups disabled for this session");
                ResolverStatus::Failed
            }
        };

        if !self.status.settle_resolver(outcome) {
            debug!(%outcome, "session stopped during swap tracker init");
        }
        self.resolver_status()
    }

    /// Closes the swap tracker session, best-effort.
    pub async fn stop_resolver(&self) {
        self.status.update_resolver_status(ResolverStatus::Stopped);
        if let Err(e) = self.tracker.stop().await {
            warn!(err = %e, "could not stop swap tracker");
        }
    }

    fn pending_record(&self, id: &DepositId) -> Option<PendingDepositRecord> {
        match self.store.get(id) {
            Ok(rec) => rec,
            Err(e) => {
                warn!(deposit_id = %id, err = %e, "could not read pending record");
                None
            }
        }
    }

    /// Derives the status of `deposit` from what the session currently knows.
    pub fn derive(&self, deposit: &Deposit, now: DateTime<Utc>) -> EffectiveStatus {
        let pending = self.pending_record(&deposit.id);
        let entry = self.cache.get(&deposit.id);
        derive_status(
            deposit,
            pending.as_ref(),
            entry.as_ref(),
            self.resolver_ready(),
            &self.policy,
            now,
        )
    }

    fn view_of(&self, deposit: &Deposit, now: DateTime<Utc>) -> DepositView {
        let pending = self.pending_record(&deposit.id);
        let entry = self.cache.get(&deposit.id);
        let status = derive_status(
            deposit,
            pending.as_ref(),
            entry.as_ref(),
            self.resolver_ready(),
            &self.policy,
            now,
        );

        DepositView {
            status,
            backend_status: deposit.status,
            tx_id: entry
                .as_ref()
                .and_then(|e| e.resolved_tx_id)
                .or_else(|| pending.and_then(|p| p.bitcoin_tx_id)),
            confirmations: entry.map(|e| e.confirmations).unwrap_or(0),
        }
    }

    /// Status of a tracked deposit from cached state only, no network.
    pub fn current_status(&self, id: &DepositId, now: DateTime<Utc>) -> Option<EffectiveStatus> {
        self.book.get(id).map(|d| self.derive(&d, now))
    }

    /// Last published view of a deposit.
    pub fn view(&self, id: &DepositId) -> Option<DepositView> {
        self.status.get_deposit(id)
    }

    /// Fetches the backend record of `id` and starts tracking it.
    ///
    /// Returns the record the session now holds, which can be newer than the
    /// fetched one if the backend answered with a stale status. A deposit the
    /// backend does not know, or returns malformed, is dropped from the
    /// session unless it is already held as `deposited`.
    pub async fn track(&self, id: &DepositId) -> Result<Option<Deposit>, TrackerError> {
        let fetched = match self.api.deposit(id).await {
            Ok(fetched) => fetched,
            Err(BackendError::Malformed(reason)) => {
                warn!(deposit_id = %id, %reason, "malformed backend record, dropping");
                None
            }
            Err(e) => return Err(e.into()),
        };

        match fetched {
            Some(deposit) => {
                book::merge_pending(self.store.as_ref(), std::slice::from_ref(&deposit));
                self.book.upsert(deposit);
                Ok(self.book.get(id))
            }
            None => {
                if let Some(held) = self
                    .book
                    .get(id)
                    .filter(|d| d.status == DepositStatus::Deposited)
                {
                    warn!(deposit_id = %id, "backend lost a deposited record, keeping it");
                    return Ok(Some(held));
                }
                if self.book.contains(id) {
                    debug!(deposit_id = %id, "deposit gone from backend, dropping");
                }
                self.forget(id);
                Ok(None)
            }
        }
    }

    fn forget(&self, id: &DepositId) {
        self.book.retain(|i| i != id);
        self.status.retain(|i| i != id);
    }

    /// Loads the deposit history of `owner`, replacing whatever was tracked
    /// before. Returns the number of deposits now tracked.
    pub async fn load_owner(&self, owner: &str) -> Result<usize, TrackerError> {
        let deposits = self.api.deposits_by_owner(owner).await?;
        book::merge_pending(self.store.as_ref(), &deposits);

        let ids: Vec<DepositId> = deposits.iter().map(|d| d.id.clone()).collect();
        for deposit in deposits {
            self.book.upsert(deposit);
        }
        self.book.retain(|i| ids.contains(i));
        self.status.retain(|i| ids.contains(i));

        trace!(%owner, tracked = self.book.len(), "loaded owner deposits");
        Ok(self.book.len())
    }

    /// Tracked deposits still in flight: `created` within the expiry window,
    /// or `initiated`.
    pub fn open_deposits(&self, now: DateTime<Utc>) -> Vec<Deposit> {
        book::open_deposits(&self.book.all(), &self.policy, now)
    }

    fn sweep_context(&self, now: Now, bypass_ttl: bool) -> SweepContext<'_> {
        SweepContext::new(
            self.explorer.as_ref(),
            self.tracker.as_ref(),
            self.store.as_ref(),
            &self.cache,
            self.resolver_ready(),
            now,
            self.polling.cache_ttl(),
            bypass_ttl,
        )
    }

    /// Refreshes the chain data of one deposit. Returns whether a check
    /// completed.
    pub async fn refresh_one(&self, deposit: &Deposit, now: Now, bypass_ttl: bool) -> bool {
        let outcome = self.sweep_context(now, bypass_ttl).refresh(deposit).await;
        matches!(outcome, RefreshOutcome::Checked { .. })
    }

    /// One background pass: refreshes every tracked deposit that is not
    /// terminal yet, one after the other, then publishes the derived statuses.
    pub async fn sweep(&self, now: Now) -> Vec<StatusTransition> {
        let deposits = self.book.all();
        let mut ctx = self.sweep_context(now, false);

        let mut checked = 0usize;
        let mut failed = 0usize;
        for deposit in &deposits {
            if self.derive(deposit, now.wall).is_terminal() {
                continue;
            }
            match ctx.refresh(deposit).await {
                RefreshOutcome::Checked { .. } => checked += 1,
                RefreshOutcome::Failed => failed += 1,
                _ => {}
            }
        }

        let views = deposits
            .iter()
            .map(|d| (d.id.clone(), self.view_of(d, now.wall)));
        let transitions = self.status.publish_sweep(views);

        debug!(
            tracked = deposits.len(),
            %checked,
            %failed,
            transitions = transitions.len(),
            "sweep done"
        );
        transitions
    }

    /// One focused poll: re-fetches the backend record, refreshes its chain
    /// data ignoring the cache ttl and publishes the result.
    ///
    /// `Ok(None)` if the backend does not know the deposit. A failed fetch
    /// falls back to the record already held.
    pub async fn poll_one(&self, id: &DepositId, now: Now) -> Result<Option<DepositView>, TrackerError> {
        let deposit = match self.track(id).await {
            Ok(Some(d)) => d,
            Ok(None) => return Ok(None),
            Err(e) => match self.book.get(id) {
                Some(d) => {
                    warn!(deposit_id = %id, err = %e, "backend fetch failed, using last record");
                    d
                }
                None => return Err(e),
            },
        };

        if !self.derive(&deposit, now.wall).is_terminal() {
            self.refresh_one(&deposit, now, true).await;
        }

        let view = self.view_of(&deposit, now.wall);
        self.status.publish_sweep([(id.clone(), view.clone())]);
        Ok(Some(view))
    }

    /// Fetches, refreshes and derives the status of one deposit.
    pub async fn effective_status(
        &self,
        id: &DepositId,
        now: Now,
    ) -> Result<Option<EffectiveStatus>, TrackerError> {
        Ok(self.poll_one(id, now).await?.map(|v| v.status))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::TimeDelta;
    use mockall::mock;
    use onesat_backend_client::test_utils::{deposit_fixture, TestDepositApi};
    use onesat_btcio::test_utils::TestExplorer;
    use onesat_db::stubs::MemPendingStore;
    use onesat_primitives::ProgressStage;
    use onesat_swap_tracker::test_utils::{InitBehavior, TestSwapTracker};
    use tokio::time::Instant;

    use super::*;
    use crate::{
        progress::ProgressIndicator,
        test_utils::{id, t0, txid},
    };

    mock! {
        Api {}

        #[async_trait]
        impl DepositApi for Api {
            async fn deposit(&self, id: &DepositId) -> Result<Option<Deposit>, BackendError>;
            async fn deposits_by_owner(&self, owner: &str) -> Result<Vec<Deposit>, BackendError>;
            async fn created_deposits(&self) -> Result<Vec<Deposit>, BackendError>;
        }
    }

    struct Harness {
        api: Arc<TestDepositApi>,
        explorer: Arc<TestExplorer>,
        tracker: Arc<TestSwapTracker>,
        store: Arc<MemPendingStore>,
        session: TrackerSession,
    }

    fn harness(deposits: Vec<Deposit>, init: InitBehavior) -> Harness {
        let api = Arc::new(TestDepositApi::new(deposits));
        let explorer = Arc::new(TestExplorer::new(100));
        let tracker = Arc::new(TestSwapTracker::new(init));
        let store = Arc::new(MemPendingStore::new());
        let session = TrackerSession::new(
            api.clone(),
            explorer.clone(),
            tracker.clone(),
            store.clone(),
            StatusPolicy::default(),
            PollingConfig::default(),
        );
        Harness {
            api,
            explorer,
            tracker,
            store,
            session,
        }
    }

    /// A reading `secs` past `base`, with wall time ten minutes after `t0`.
    fn at(base: Instant, secs: u64) -> Now {
        Now {
            at: base + Duration::from_secs(secs),
            wall: t0() + TimeDelta::minutes(10),
        }
    }

    fn swap_deposit(b: u8) -> Deposit {
        let mut d = deposit_fixture(b, DepositStatus::Created, t0());
        d.swap_id = Some(format!("swap-{b}"));
        d
    }

    #[tokio::test]
    async fn test_scenario_confirmations_to_deposited() {
        let h = harness(vec![swap_deposit(1)], InitBehavior::Succeed);
        h.tracker.insert_swap("swap-1", Some(txid(1)));
        h.explorer.include(txid(1), 100);
        assert_eq!(h.session.init_resolver().await, ResolverStatus::Ready);

        let base = Instant::now();
        let mut indicator = ProgressIndicator::new();

        let view = h.session.poll_one(&id(1), at(base, 0)).await.unwrap().unwrap();
        assert_eq!(view.status, EffectiveStatus::Initiated);
        assert_eq!(view.confirmations, 1);
        assert_eq!(indicator.observe(view.status), ProgressStage::BtcDetected);

        h.explorer.set_tip(102);
        let view = h.session.poll_one(&id(1), at(base, 5)).await.unwrap().unwrap();
        assert_eq!(view.status, EffectiveStatus::Redeemed);
        assert_eq!(view.confirmations, 3);
        assert_eq!(indicator.observe(view.status), ProgressStage::Redeemed);

        h.api.set_status(&id(1), DepositStatus::Deposited);
        let tx_calls = h.explorer.tx_calls();
        let view = h.session.poll_one(&id(1), at(base, 10)).await.unwrap().unwrap();
        assert_eq!(view.status, EffectiveStatus::Deposited);
        assert_eq!(indicator.observe(view.status), ProgressStage::Success);
        // nothing left to measure
        assert_eq!(h.explorer.tx_calls(), tx_calls);

        // a stale replica cannot take it back
        h.api.set_status(&id(1), DepositStatus::Created);
        let view = h.session.poll_one(&id(1), at(base, 15)).await.unwrap().unwrap();
        assert_eq!(view.status, EffectiveStatus::Deposited);
    }

    #[tokio::test]
    async fn test_failed_init_keeps_checking() {
        let h = harness(vec![swap_deposit(1)], InitBehavior::Fail);
        h.tracker.insert_swap("swap-1", Some(txid(1)));
        assert_eq!(h.session.init_resolver().await, ResolverStatus::Failed);

        let status = h
            .session
            .effective_status(&id(1), at(Instant::now(), 0))
            .await
            .unwrap();
        assert_eq!(status, Some(EffectiveStatus::Checking));
        assert_eq!(h.tracker.lookups(), 0);
    }

    #[tokio::test]
    async fn test_ready_resolver_without_tx_is_created() {
        let h = harness(vec![swap_deposit(1)], InitBehavior::Succeed);
        h.session.init_resolver().await;

        let status = h
            .session
            .effective_status(&id(1), at(Instant::now(), 0))
            .await
            .unwrap();
        assert_eq!(status, Some(EffectiveStatus::Created));
        assert_eq!(h.tracker.lookups(), 1);
    }

    #[tokio::test]
    async fn test_stop_wins_over_late_init() {
        let h = harness(vec![], InitBehavior::Succeed);
        h.session.stop_resolver().await;
        assert_eq!(h.session.init_resolver().await, ResolverStatus::Stopped);
        assert_eq!(h.tracker.stops(), 1);
    }

    #[tokio::test]
    async fn test_sweep_publishes_and_skips_terminal() {
        let old = deposit_fixture(2, DepositStatus::Created, t0() - TimeDelta::days(2));
        let done = deposit_fixture(3, DepositStatus::Deposited, t0());
        let h = harness(vec![swap_deposit(1), old, done], InitBehavior::Succeed);
        h.session.init_resolver().await;
        h.store
            .insert(PendingDepositRecord::new(id(1), t0()).with_bitcoin_tx(txid(1)))
            .unwrap();
        h.explorer.include(txid(1), 99);

        assert_eq!(h.session.load_owner("0x04a1").await.unwrap(), 3);

        let base = Instant::now();
        let transitions = h.session.sweep(at(base, 0)).await;
        assert_eq!(transitions.len(), 3);

        let chan = h.session.status_channel();
        assert_eq!(chan.get_status(&id(1)), Some(EffectiveStatus::Redeemed));
        assert_eq!(chan.get_status(&id(2)), Some(EffectiveStatus::Expired));
        assert_eq!(chan.get_status(&id(3)), Some(EffectiveStatus::Deposited));
        assert!(h.session.cache().get(&id(2)).is_none());
        assert!(h.session.cache().get(&id(3)).is_none());
        assert_eq!(h.explorer.tip_calls(), 1);

        // within the ttl nothing is fetched again
        assert!(h.session.sweep(at(base, 3)).await.is_empty());
        assert_eq!(h.explorer.tip_calls(), 1);
    }

    #[tokio::test]
    async fn test_load_owner_merges_and_drops() {
        let h = harness(vec![swap_deposit(1), swap_deposit(2)], InitBehavior::Succeed);
        h.store.insert(PendingDepositRecord::new(id(1), t0())).unwrap();

        h.session.load_owner("0x04a1").await.unwrap();
        assert_eq!(
            h.store.get(&id(1)).unwrap().unwrap().swap_id.as_deref(),
            Some("swap-1")
        );
        h.session.sweep(at(Instant::now(), 0)).await;
        assert!(h.session.view(&id(2)).is_some());

        // the backend no longer lists deposit 2
        let mut moved = swap_deposit(2);
        moved.owner_address = "0x0other".to_string();
        h.api.upsert(moved);
        assert_eq!(h.session.load_owner("0x04a1").await.unwrap(), 1);
        assert!(!h.session.book().contains(&id(2)));
        assert!(h.session.view(&id(2)).is_none());
    }

    #[tokio::test]
    async fn test_unknown_and_unreachable() {
        let h = harness(vec![swap_deposit(1)], InitBehavior::Succeed);
        let now = at(Instant::now(), 0);

        assert_eq!(h.session.effective_status(&id(9), now).await.unwrap(), None);

        h.api.set_failing(true);
        assert!(matches!(
            h.session.effective_status(&id(1), now).await,
            Err(TrackerError::Backend(BackendError::Http(_)))
        ));

        h.api.set_failing(false);
        h.session.track(&id(1)).await.unwrap();
        h.api.set_failing(true);
        // falls back to the record already held
        assert_eq!(
            h.session.effective_status(&id(1), now).await.unwrap(),
            Some(EffectiveStatus::Checking)
        );
    }

    #[test]
    fn test_current_status_needs_tracking() {
        let h = harness(vec![], InitBehavior::Succeed);
        assert_eq!(h.session.current_status(&id(1), t0()), None);

        h.session.book().upsert(deposit_fixture(1, DepositStatus::Initiated, t0()));
        assert_eq!(
            h.session.current_status(&id(1), t0()),
            Some(EffectiveStatus::Initiated)
        );
        assert_eq!(h.session.open_deposits(t0()).len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_record_is_dropped() {
        let mut api = MockApi::new();
        let mut calls = 0;
        api.expect_deposit().times(2).returning(move |i| {
            calls += 1;
            if calls == 1 {
                Ok(Some(deposit_fixture(1, DepositStatus::Created, t0())))
            } else {
                Err(BackendError::Malformed(format!("bad record {i}")))
            }
        });

        let session = TrackerSession::new(
            Arc::new(api),
            Arc::new(TestExplorer::new(100)),
            Arc::new(TestSwapTracker::new(InitBehavior::Succeed)),
            Arc::new(MemPendingStore::new()),
            StatusPolicy::default(),
            PollingConfig::default(),
        );
        let now = at(Instant::now(), 0);

        assert!(session.poll_one(&id(1), now).await.unwrap().is_some());
        assert!(session.view(&id(1)).is_some());

        assert_eq!(session.poll_one(&id(1), now).await.unwrap(), None);
        assert!(!session.book().contains(&id(1)));
        assert!(session.view(&id(1)).is_none());
    }

    #[tokio::test]
    async fn test_deposited_survives_gateway_errors_and_stale_replicas() {
        let mut api = MockApi::new();
        let mut calls = 0;
        api.expect_deposit().times(4).returning(move |i| {
            calls += 1;
            match calls {
                1 => Ok(Some(deposit_fixture(1, DepositStatus::Deposited, t0()))),
                2 => Err(BackendError::Status(502)),
                3 => Err(BackendError::Malformed(format!("bad record {i}"))),
                _ => Ok(Some(deposit_fixture(1, DepositStatus::Created, t0()))),
            }
        });

        let session = TrackerSession::new(
            Arc::new(api),
            Arc::new(TestExplorer::new(100)),
            Arc::new(TestSwapTracker::new(InitBehavior::Succeed)),
            Arc::new(MemPendingStore::new()),
            StatusPolicy::default(),
            PollingConfig::default(),
        );
        let now = at(Instant::now(), 0);

        for _ in 0..4 {
            let view = session.poll_one(&id(1), now).await.unwrap().unwrap();
            assert_eq!(view.status, EffectiveStatus::Deposited);
        }
        assert_eq!(
            session.book().get(&id(1)).unwrap().status,
            DepositStatus::Deposited
        );
    }
}
