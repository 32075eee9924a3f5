//! Background and focused polling loops of a session.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use onesat_primitives::{DepositId, EffectiveStatus, ProgressStage};
use onesat_status::{DepositView, StatusSnapshot};
use onesat_tasks::{ShutdownGuard, TaskScope};
use tokio::{
    runtime::Handle,
    select,
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::*;

use crate::{clock::Now, errors::TrackerError, progress::ProgressIndicator, session::TrackerSession};

/// Which deposits the background loop tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositSource {
    /// Full history of an owner address, reloaded every tick.
    Owner(String),

    /// A fixed set of deposit ids.
    Ids(Vec<DepositId>),
}

/// Owns the polling loops of one [`TrackerSession`].
///
/// `start` spawns the swap tracker setup and the background sweep, `stop`
/// (or dropping the scheduler) cancels them and closes the swap tracker
/// session, even if setup has not finished.
pub struct Scheduler {
    session: Arc<TrackerSession>,
    source: DepositSource,
    handle: Handle,
    scope: TaskScope,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Scheduler {
    pub fn new(session: Arc<TrackerSession>, source: DepositSource, handle: Handle) -> Self {
        Self {
            session,
            source,
            scope: TaskScope::new("scheduler", handle.clone()),
            handle,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<TrackerSession> {
        &self.session
    }

    pub fn start(&self) -> Result<(), TrackerError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TrackerError::AlreadyStarted);
        }

        let session = self.session.clone();
        self.scope.spawn("resolver-init", async move {
            session.init_resolver().await;
        });

        let session = self.session.clone();
        let source = self.source.clone();
        self.scope
            .spawn_with_shutdown("background-sweep", |shutdown| {
                sweep_task(session, source, shutdown)
            });

        info!(source = ?self.source, "scheduler started");
        Ok(())
    }

    /// Cancels every loop and closes the swap tracker session.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        let timeout = self.session.polling().shutdown_timeout();
        if !self.scope.shutdown(timeout).await {
            warn!("some scheduler tasks had to be aborted");
        }
        for panic in self.scope.take_panics() {
            warn!(task = panic.task_name(), "task panicked during session");
        }
        self.session.stop_resolver().await;
        info!("scheduler stopped");
    }

    /// Status of a tracked deposit, derived now from cached state.
    pub fn current_status(&self, id: &DepositId) -> Option<EffectiveStatus> {
        self.session.current_status(id, Utc::now())
    }

    /// Snapshot published after every background sweep.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.session.status_channel().subscribe_snapshot()
    }

    /// Starts polling one deposit closely until it settles or the returned
    /// view is closed.
    pub fn focus(&self, id: DepositId) -> FocusedView {
        FocusedView::open(self.session.clone(), id, self.handle.clone())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.scope.shutdown_signal().send();

        if self.started.load(Ordering::SeqCst) {
            let session = self.session.clone();
            self.handle.spawn(async move {
                session.stop_resolver().await;
            });
        }
    }
}

async fn reload(session: &TrackerSession, source: &DepositSource) {
    match source {
        DepositSource::Owner(owner) => {
            if let Err(e) = session.load_owner(owner).await {
                warn!(%owner, err = %e, "could not load owner deposits, keeping last known");
            }
        }
        DepositSource::Ids(ids) => {
            for id in ids {
                if let Err(e) = session.track(id).await {
                    warn!(deposit_id = %id, err = %e, "could not fetch deposit");
                }
            }
        }
    }
}

async fn sweep_once(session: &TrackerSession, source: &DepositSource) {
    reload(session, source).await;
    for t in session.sweep(Now::now()).await {
        match t.from {
            Some(from) => info!(deposit_id = %t.id, %from, to = %t.to, "deposit status changed"),
            None => info!(deposit_id = %t.id, status = %t.to, "tracking deposit"),
        }
    }
}

async fn sweep_task(session: Arc<TrackerSession>, source: DepositSource, shutdown: ShutdownGuard) {
    let mut ticker = interval(session.polling().background_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick = 0u64;
    loop {
        select! {
            _ = shutdown.wait_for_shutdown() => break,
            _ = ticker.tick() => {}
        }

        tick += 1;
        let span = debug_span!("sweep", %tick);
        select! {
            _ = shutdown.wait_for_shutdown() => break,
            _ = sweep_once(&session, &source).instrument(span) => {}
        }
    }
    debug!("background sweep exiting");
}

/// What a focused view currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusState {
    pub status: Option<EffectiveStatus>,
    pub stage: Option<ProgressStage>,
    pub view: Option<DepositView>,

    /// Polls completed so far, failed ones included.
    pub polls: u64,

    /// The deposit settled or disappeared, polling has ended.
    pub finished: bool,
}

/// Close polling of a single deposit, with its progress indicator.
///
/// Polling ends on its own once the deposit reaches a terminal status.
/// Dropping the view cancels it immediately.
pub struct FocusedView {
    id: DepositId,
    scope: TaskScope,
    state: watch::Receiver<FocusState>,
}

impl FocusedView {
    fn open(session: Arc<TrackerSession>, id: DepositId, handle: Handle) -> Self {
        let (tx, rx) = watch::channel(FocusState::default());
        let scope = TaskScope::new(format!("focus-{id}"), handle);

        let task_id = id.clone();
        scope.spawn_with_shutdown("focused-poll", |shutdown| {
            focus_task(session, task_id, tx, shutdown)
        });

        Self {
            id,
            scope,
            state: rx,
        }
    }

    pub fn id(&self) -> &DepositId {
        &self.id
    }

    pub fn current(&self) -> FocusState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FocusState> {
        self.state.clone()
    }

    /// Waits until polling ends and returns the final state.
    pub async fn wait_until_finished(&self) -> FocusState {
        let mut rx = self.state.clone();
        let res = rx.wait_for(|s| s.finished).await.map(|s| s.clone());
        match res {
            Ok(state) => state,
            // task is gone without finishing, e.g. it panicked
            Err(_) => self.current(),
        }
    }

    /// Cancels polling, giving an in-flight poll up to `timeout` to land.
    pub async fn close(self, timeout: Duration) {
        self.scope.shutdown(timeout).await;
    }
}

async fn focus_task(
    session: Arc<TrackerSession>,
    id: DepositId,
    state: watch::Sender<FocusState>,
    shutdown: ShutdownGuard,
) {
    let mut indicator = ProgressIndicator::new();
    let mut ticker = interval(session.polling().focused_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            _ = shutdown.wait_for_shutdown() => break,
            _ = ticker.tick() => {}
        }

        let res = select! {
            _ = shutdown.wait_for_shutdown() => break,
            res = session.poll_one(&id, Now::now()) => res,
        };

        let view = match res {
            Ok(Some(view)) => view,
            Ok(None) => {
                warn!(deposit_id = %id, "focused deposit not found");
                state.send_modify(|s| {
                    s.polls += 1;
                    s.finished = true;
                });
                break;
            }
            Err(e) => {
                warn!(deposit_id = %id, err = %e, "focused poll failed");
                state.send_modify(|s| s.polls += 1);
                continue;
            }
        };

        let stage = indicator.observe(view.status);
        let finished = view.status.is_terminal();
        trace!(deposit_id = %id, status = %view.status, %stage, "focused poll");

        state.send_modify(|s| {
            s.status = Some(view.status);
            s.stage = Some(stage);
            s.view = Some(view);
            s.polls += 1;
            s.finished = finished;
        });

        if finished {
            debug!(deposit_id = %id, %stage, "focused deposit settled");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use onesat_backend_client::test_utils::{deposit_fixture, TestDepositApi};
    use onesat_btcio::test_utils::TestExplorer;
    use onesat_config::PollingConfig;
    use onesat_db::stubs::MemPendingStore;
    use onesat_primitives::{Deposit, DepositStatus};
    use onesat_status::ResolverStatus;
    use onesat_swap_tracker::test_utils::{InitBehavior, TestSwapTracker};
    use tokio::time::sleep;

    use super::*;
    use crate::{
        policy::StatusPolicy,
        test_utils::{id, txid},
    };

    const OWNER: &str = "0x04a1";

    struct Harness {
        api: Arc<TestDepositApi>,
        explorer: Arc<TestExplorer>,
        tracker: Arc<TestSwapTracker>,
        session: Arc<TrackerSession>,
    }

    fn harness(deposits: Vec<Deposit>, init: InitBehavior) -> Harness {
        let api = Arc::new(TestDepositApi::new(deposits));
        let explorer = Arc::new(TestExplorer::new(100));
        let tracker = Arc::new(TestSwapTracker::new(init));
        let session = Arc::new(TrackerSession::new(
            api.clone(),
            explorer.clone(),
            tracker.clone(),
            Arc::new(MemPendingStore::new()),
            StatusPolicy::default(),
            PollingConfig::default(),
        ));
        Harness {
            api,
            explorer,
            tracker,
            session,
        }
    }

    /// Created just now, so wall-clock expiry never kicks in.
    fn fresh_deposit(b: u8) -> Deposit {
        let mut d = deposit_fixture(b, DepositStatus::Created, Utc::now());
        d.swap_id = Some(format!("swap-{b}"));
        d
    }

    fn owner_scheduler(h: &Harness) -> Scheduler {
        Scheduler::new(
            h.session.clone(),
            DepositSource::Owner(OWNER.to_string()),
            Handle::current(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_focused_view_follows_deposit_to_the_end() {
        let h = harness(vec![fresh_deposit(1)], InitBehavior::Succeed);
        h.tracker.insert_swap("swap-1", Some(txid(1)));
        h.explorer.include(txid(1), 100);

        let scheduler = owner_scheduler(&h);
        scheduler.start().unwrap();
        h.session
            .status_channel()
            .wait_until_resolver_settled()
            .await
            .unwrap();

        let view = scheduler.focus(id(1));
        let mut rx = view.subscribe();

        let s = rx
            .wait_for(|s| s.status == Some(EffectiveStatus::Initiated))
            .await
            .unwrap()
            .clone();
        assert_eq!(s.stage, Some(ProgressStage::BtcDetected));
        assert_eq!(s.view.unwrap().confirmations, 1);

        h.explorer.set_tip(102);
        let s = rx
            .wait_for(|s| s.status == Some(EffectiveStatus::Redeemed))
            .await
            .unwrap()
            .clone();
        assert_eq!(s.stage, Some(ProgressStage::Redeemed));

        h.api.set_status(&id(1), DepositStatus::Deposited);
        let done = view.wait_until_finished().await;
        assert_eq!(done.status, Some(EffectiveStatus::Deposited));
        assert_eq!(done.stage, Some(ProgressStage::Success));

        // polling has ceased
        let fetches = h.api.fetches();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(h.api.fetches(), fetches);
        assert_eq!(view.current().polls, done.polls);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_publishes_changes() {
        let h = harness(
            vec![fresh_deposit(1), fresh_deposit(2)],
            InitBehavior::Succeed,
        );
        h.tracker.insert_swap("swap-1", Some(txid(1)));
        h.explorer.include(txid(1), 100);

        let scheduler = owner_scheduler(&h);
        let mut rx = scheduler.subscribe();
        scheduler.start().unwrap();

        rx.wait_for(|snap| {
            snap.status_of(&id(1)) == Some(EffectiveStatus::Initiated)
                && snap.status_of(&id(2)) == Some(EffectiveStatus::Created)
        })
        .await
        .unwrap();

        h.explorer.set_tip(101);
        rx.wait_for(|snap| snap.status_of(&id(1)) == Some(EffectiveStatus::Redeemed))
            .await
            .unwrap();

        assert_eq!(
            scheduler.current_status(&id(1)),
            Some(EffectiveStatus::Redeemed)
        );
        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_id_source_tracks_listed_deposits() {
        let h = harness(
            vec![fresh_deposit(1), fresh_deposit(2)],
            InitBehavior::Fail,
        );
        let scheduler = Scheduler::new(
            h.session.clone(),
            DepositSource::Ids(vec![id(2)]),
            Handle::current(),
        );
        let mut rx = scheduler.subscribe();
        scheduler.start().unwrap();

        let snap = rx
            .wait_for(|snap| snap.revision > 0)
            .await
            .unwrap()
            .clone();
        assert_eq!(snap.deposits.len(), 1);
        // swap tracker never came up
        assert_eq!(snap.status_of(&id(2)), Some(EffectiveStatus::Checking));
        assert!(!h.session.book().contains(&id(1)));

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_init_closes_tracker() {
        let h = harness(vec![fresh_deposit(1)], InitBehavior::Hang);
        let scheduler = owner_scheduler(&h);
        scheduler.start().unwrap();
        assert!(matches!(
            scheduler.start(),
            Err(TrackerError::AlreadyStarted)
        ));

        sleep(Duration::from_millis(10)).await;
        scheduler.stop().await;
        scheduler.stop().await;

        assert_eq!(h.session.resolver_status(), ResolverStatus::Stopped);
        assert_eq!(h.tracker.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_tracker() {
        let h = harness(vec![fresh_deposit(1)], InitBehavior::Hang);
        {
            let scheduler = owner_scheduler(&h);
            scheduler.start().unwrap();
            sleep(Duration::from_millis(10)).await;
        }
        sleep(Duration::from_millis(10)).await;

        assert_eq!(h.tracker.stops(), 1);
        assert_eq!(h.session.resolver_status(), ResolverStatus::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_view_stops_polling() {
        let h = harness(vec![fresh_deposit(1)], InitBehavior::Succeed);
        let scheduler = owner_scheduler(&h);

        let view = scheduler.focus(id(1));
        let mut rx = view.subscribe();
        rx.wait_for(|s| s.polls >= 2).await.unwrap();
        assert!(!view.current().finished);

        view.close(Duration::from_secs(1)).await;
        let fetches = h.api.fetches();
        sleep(Duration::from_secs(60)).await;
        assert_eq!(h.api.fetches(), fetches);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_focus_finishes() {
        let h = harness(vec![], InitBehavior::Succeed);
        let scheduler = owner_scheduler(&h);

        let view = scheduler.focus(id(7));
        let state = view.wait_until_finished().await;
        assert!(state.finished);
        assert_eq!(state.status, None);
        assert_eq!(state.polls, 1);
    }
}
