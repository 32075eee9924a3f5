use std::sync::Arc;

use anyhow::bail;
use argh::FromArgs;
use onesat_primitives::DepositId;
use onesat_reconciler::{DepositSource, Scheduler, TrackerSession};
use onesat_status::StatusSnapshot;
use tokio::{runtime::Handle, select, signal};
use tracing::*;

use crate::helpers::format_view;

/// Tracks deposits in the background and prints every status change
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "track")]
pub struct TrackArgs {
    /// owner address whose deposit history to track
    #[argh(option)]
    pub owner: Option<String>,

    /// deposit id to track, may be repeated
    #[argh(option, long = "id")]
    pub ids: Vec<DepositId>,
}

impl TrackArgs {
    fn source(self) -> anyhow::Result<DepositSource> {
        match (self.owner, self.ids.is_empty()) {
            (Some(owner), true) => Ok(DepositSource::Owner(owner)),
            (None, false) => Ok(DepositSource::Ids(self.ids)),
            _ => bail!("specify either --owner or at least one --id"),
        }
    }
}

pub async fn track(args: TrackArgs, session: Arc<TrackerSession>, handle: Handle) -> anyhow::Result<()> {
    let scheduler = Scheduler::new(session, args.source()?, handle);
    let mut rx = scheduler.subscribe();
    scheduler.start()?;

    let mut shown = StatusSnapshot::default();
    loop {
        select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(err = %e, "could not listen for ctrl-c");
                }
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = rx.borrow_and_update().clone();
                for (id, view) in &snap.deposits {
                    if shown.deposits.get(id) != Some(view) {
                        println!("{}", format_view(id, view));
                    }
                }
                shown = snap;
            }
        }
    }

    scheduler.stop().await;
    Ok(())
}
