use std::{
    pin::pin,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct ShutdownSignal(Arc<AtomicBool>, Arc<Notify>);

impl ShutdownSignal {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)), Arc::new(Notify::new()))
    }

    /// Send shutdown signal
    pub fn send(&self) {
        self.0.store(true, Ordering::SeqCst);
        self.1.notify_waiters();
    }

    /// Check if shutdown signal has been sent
    pub fn should_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Waits until shutdown signal is sent
    pub async fn wait_for_shutdown(&self) {
        loop {
            // register interest before checking the flag so a concurrent
            // `send` cannot slip between the two
            let mut notified = pin!(self.1.notified());
            notified.as_mut().enable();
            if self.should_shutdown() {
                return;
            }
            notified.await;
        }
    }
}

/// Handed to cooperative tasks; counts as pending until dropped.
#[derive(Debug)]
pub struct ShutdownGuard(ShutdownSignal, Arc<AtomicUsize>);

impl ShutdownGuard {
    pub(crate) fn new(signal: ShutdownSignal, counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(signal, counter)
    }

    /// Check if shutdown signal has been sent
    pub fn should_shutdown(&self) -> bool {
        self.0.should_shutdown()
    }

    /// Waits until shutdown signal is sent
    pub async fn wait_for_shutdown(&self) {
        self.0.wait_for_shutdown().await
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.1.fetch_sub(1, Ordering::SeqCst);
    }
}
