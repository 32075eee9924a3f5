//! Manages and updates the published status snapshot.

use std::sync::Arc;

use onesat_primitives::{DepositId, EffectiveStatus};
use thiserror::Error;
use tokio::sync::watch::{self, error::RecvError};
use tracing::*;

use crate::snapshot::{DepositView, ResolverStatus, StatusSnapshot, StatusTransition};

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status channel closed")]
    Closed(#[from] RecvError),
}

/// A wrapper around the status senders and receivers.
///
/// Cheap to clone. Every clone observes the same channel, so the scheduler
/// publishes and any number of views read or subscribe.
#[derive(Debug, Clone)]
pub struct StatusChannel {
    sender: Arc<StatusSender>,
    receiver: Arc<StatusReceiver>,
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        let (snap_tx, snap_rx) = watch::channel(StatusSnapshot::default());
        let (res_tx, res_rx) = watch::channel(ResolverStatus::default());

        let sender = Arc::new(StatusSender {
            snapshot: snap_tx,
            resolver: res_tx,
        });
        let receiver = Arc::new(StatusReceiver {
            snapshot: snap_rx,
            resolver: res_rx,
        });

        Self { sender, receiver }
    }

    // Receiver methods

    /// Gets the latest [`StatusSnapshot`].
    pub fn get_snapshot(&self) -> StatusSnapshot {
        self.receiver.snapshot.borrow().clone()
    }

    /// Gets the last published view of one deposit.
    pub fn get_deposit(&self, id: &DepositId) -> Option<DepositView> {
        self.receiver.snapshot.borrow().deposits.get(id).cloned()
    }

    pub fn get_status(&self, id: &DepositId) -> Option<EffectiveStatus> {
        self.receiver.snapshot.borrow().status_of(id)
    }

    /// Gets the latest [`ResolverStatus`].
    pub fn get_resolver_status(&self) -> ResolverStatus {
        *self.receiver.resolver.borrow()
    }

    // Subscription functions.

    pub fn subscribe_snapshot(&self) -> watch::Receiver<StatusSnapshot> {
        self.sender.snapshot.subscribe()
    }

    pub fn subscribe_resolver(&self) -> watch::Receiver<ResolverStatus> {
        self.sender.resolver.subscribe()
    }

    /// Waits until the resolver finished initializing, successfully or not.
    pub async fn wait_until_resolver_settled(&self) -> Result<ResolverStatus, StatusError> {
        let mut rx = self.receiver.resolver.clone();
        let status = rx.wait_for(|s| s.is_settled()).await?;
        Ok(*status)
    }

    // Sender methods

    /// Publishes the result of a sweep.
    ///
    /// Deposits not in `views` keep their previous entry. Subscribers are only
    /// woken if something changed. Returns the effective status transitions.
    pub fn publish_sweep(
        &self,
        views: impl IntoIterator<Item = (DepositId, DepositView)>,
    ) -> Vec<StatusTransition> {
        let mut transitions = Vec::new();

        self.sender.snapshot.send_if_modified(|snap| {
            let mut modified = false;
            for (id, view) in views {
                let prev = snap.deposits.get(&id);
                if prev == Some(&view) {
                    continue;
                }

                let from = prev.map(|p| p.status);
                if from != Some(view.status) {
                    transitions.push(StatusTransition {
                        id: id.clone(),
                        from,
                        to: view.status,
                    });
                }
                snap.deposits.insert(id, view);
                modified = true;
            }

            if modified {
                snap.revision += 1;
            }
            modified
        });

        for t in &transitions {
            trace!(deposit_id = %t.id, from = ?t.from, to = %t.to, "status transition");
        }
        transitions
    }

    /// Drops deposits that are no longer tracked.
    pub fn retain(&self, keep: impl Fn(&DepositId) -> bool) {
        self.sender.snapshot.send_if_modified(|snap| {
            let before = snap.deposits.len();
            snap.deposits.retain(|id, _| keep(id));
            before != snap.deposits.len()
        });
    }

    /// Moves the resolver out of `Initializing`. Returns `false` and leaves
    /// the status alone if it already settled, e.g. stopped while init was
    /// still running.
    pub fn settle_resolver(&self, status: ResolverStatus) -> bool {
        let settled = self.sender.resolver.send_if_modified(|cur| {
            if cur.is_settled() {
                return false;
            }
            *cur = status;
            true
        });
        if settled {
            debug!(to = %status, "resolver settled");
        }
        settled
    }

    pub fn update_resolver_status(&self, status: ResolverStatus) {
        let prev = self.sender.resolver.send_replace(status);
        if prev != status {
            debug!(from = %prev, to = %status, "resolver status changed");
        }
    }
}

/// Wrapper for watch status receivers
#[derive(Debug, Clone)]
struct StatusReceiver {
    snapshot: watch::Receiver<StatusSnapshot>,
    resolver: watch::Receiver<ResolverStatus>,
}

/// Wrapper for watch status senders
#[derive(Debug)]
struct StatusSender {
    snapshot: watch::Sender<StatusSnapshot>,
    resolver: watch::Sender<ResolverStatus>,
}
