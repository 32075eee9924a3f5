use std::{
    future::Future,
    panic,
    pin::pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures_util::{future::select, FutureExt, TryFutureExt};
use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle, time::Instant};
use tracing::*;

use crate::{
    panic::PanickedTaskError,
    shutdown::{ShutdownGuard, ShutdownSignal},
};

/// A group of async tasks owned by one view.
///
/// Tasks never outlive the scope: [`TaskScope::shutdown`] signals them and
/// aborts whatever has not finished by the deadline, and dropping the scope
/// signals and aborts immediately. A panicking task is logged and recorded,
/// it never takes the process down.
#[derive(Debug)]
pub struct TaskScope {
    name: String,
    tokio_handle: Handle,
    shutdown_signal: ShutdownSignal,
    pending_tasks_counter: Arc<AtomicUsize>,
    panicked_tasks_tx: mpsc::UnboundedSender<PanickedTaskError>,
    panicked_tasks_rx: Mutex<mpsc::UnboundedReceiver<PanickedTaskError>>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl TaskScope {
    pub fn new(name: impl Into<String>, tokio_handle: Handle) -> Self {
        let (panicked_tasks_tx, panicked_tasks_rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            tokio_handle,
            shutdown_signal: ShutdownSignal::new(),
            pending_tasks_counter: Arc::new(AtomicUsize::new(0)),
            panicked_tasks_tx,
            panicked_tasks_rx: Mutex::new(panicked_tasks_rx),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get shutdown signal trigger
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown_signal.clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown_signal.should_shutdown()
    }

    /// Number of cooperative tasks still holding their guard.
    pub fn pending_tasks(&self) -> usize {
        self.pending_tasks_counter.load(Ordering::SeqCst)
    }

    /// Spawns a task that is dropped at its next await point once shutdown is
    /// signalled.
    pub fn spawn(&self, name: &'static str, fut: impl Future<Output = ()> + Send + 'static) {
        let shutdown = self.shutdown_signal.clone();
        let task = self.catch_panics(name, fut);

        let task = async move {
            let task = pin!(task);
            let shutdown = pin!(shutdown.wait_for_shutdown());
            let _ = select(shutdown, task).await;
        };
        self.track(name, task);
    }

    /// Spawns a task that observes shutdown itself through its guard.
    ///
    /// It is still aborted if it ignores the signal past the shutdown
    /// deadline.
    pub fn spawn_with_shutdown<F>(&self, name: &'static str, async_func: impl FnOnce(ShutdownGuard) -> F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = ShutdownGuard::new(
            self.shutdown_signal.clone(),
            self.pending_tasks_counter.clone(),
        );
        let fut = async_func(guard);
        let task = self.catch_panics(name, fut);
        self.track(name, task);
    }

    fn catch_panics(
        &self,
        name: &'static str,
        fut: impl Future<Output = ()> + Send + 'static,
    ) -> impl Future<Output = ()> + Send + 'static {
        let panicked_tasks_tx = self.panicked_tasks_tx.clone();
        let scope = self.name.clone();

        // wrap the task in catch unwind
        panic::AssertUnwindSafe(fut)
            .catch_unwind()
            .map_err(move |error| {
                let task_error = PanickedTaskError::new(name, error);
                error!(%scope, "{task_error}");
                let _ = panicked_tasks_tx.send(task_error);
            })
            .map(drop)
    }

    fn track(&self, name: &'static str, task: impl Future<Output = ()> + Send + 'static) {
        if self.is_shut_down() {
            debug!(scope = %self.name, task = name, "scope already shut down, not spawning");
            return;
        }

        let handle = self.tokio_handle.spawn(task);
        let mut tasks = self.tasks.lock();
        tasks.retain(|(_, h)| !h.is_finished());
        tasks.push((name, handle));
        trace!(scope = %self.name, task = name, "spawned task");
    }

    /// Panics caught since the last call.
    pub fn take_panics(&self) -> Vec<PanickedTaskError> {
        let mut rx = self.panicked_tasks_rx.lock();
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    /// Signals every task and waits up to `timeout` for them to finish,
    /// aborting stragglers. Returns whether everything finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.shutdown_signal.send();

        let tasks = std::mem::take(&mut *self.tasks.lock());
        let deadline = Instant::now() + timeout;
        let mut in_time = true;

        for (name, mut handle) in tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(_) => {}
                Err(_) => {
                    warn!(scope = %self.name, task = name, "task ignored shutdown, aborting");
                    handle.abort();
                    in_time = false;
                }
            }
        }

        debug!(scope = %self.name, %in_time, "scope shut down");
        in_time
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.shutdown_signal.send();
        for (_, handle) in self.tasks.get_mut().drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[tokio::test]
    async fn test_spawned_task_cancelled_on_shutdown() {
        let scope = TaskScope::new("test", Handle::current());
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        scope.spawn("sleeper", async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert!(scope.shutdown(Duration::from_secs(1)).await);
        assert!(!finished.load(Ordering::SeqCst));
        assert!(scope.is_shut_down());
    }

    #[tokio::test]
    async fn test_cooperative_task_sees_signal() {
        let scope = TaskScope::new("test", Handle::current());
        let saw_signal = Arc::new(AtomicBool::new(false));
        let flag = saw_signal.clone();

        scope.spawn_with_shutdown("loop", |shutdown| async move {
            loop {
                if shutdown.should_shutdown() {
                    flag.store(true, Ordering::SeqCst);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        assert_eq!(scope.pending_tasks(), 1);

        assert!(scope.shutdown(Duration::from_secs(5)).await);
        assert!(saw_signal.load(Ordering::SeqCst));
        assert_eq!(scope.pending_tasks(), 0);
    }

    #[tokio::test]
    async fn test_stubborn_task_aborted() {
        let scope = TaskScope::new("test", Handle::current());

        scope.spawn_with_shutdown("stubborn", |_shutdown| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });

        assert!(!scope.shutdown(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_panic_is_recorded_not_propagated() {
        let scope = TaskScope::new("test", Handle::current());

        // dont want to print stack trace for expected error while running test
        let original_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));

        scope.spawn("panictask", async {
            panic!("intentional panic");
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(scope.shutdown(Duration::from_secs(1)).await);

        panic::set_hook(original_hook);

        let panics = scope.take_panics();
        assert_eq!(panics.len(), 1);
        assert_eq!(panics[0].task_name(), "panictask");
        assert_eq!(panics[0].error(), Some("intentional panic"));
    }

    #[tokio::test]
    async fn test_no_spawn_after_shutdown() {
        let scope = TaskScope::new("test", Handle::current());
        scope.shutdown(Duration::from_millis(10)).await;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        scope.spawn("late", async move {
            flag.store(true, Ordering::SeqCst);
        });
        tokio::task::yield_now().await;

        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_aborts_tasks() {
        let signal;
        {
            let scope = TaskScope::new("test", Handle::current());
            signal = scope.shutdown_signal();
            scope.spawn("sleeper", async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            });
        }
        assert!(signal.should_shutdown());
    }
}
