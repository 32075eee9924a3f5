use std::sync::Arc;

use anyhow::bail;
use argh::FromArgs;
use onesat_primitives::DepositId;
use onesat_reconciler::{DepositSource, FocusState, Scheduler, TrackerSession};
use tokio::{runtime::Handle, select, signal};
use tracing::*;

use crate::helpers::format_view;

/// Polls one deposit closely and shows its progress until it settles
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "watch")]
pub struct WatchArgs {
    /// deposit id, hex with or without 0x
    #[argh(positional)]
    pub deposit_id: DepositId,
}

pub async fn watch(args: WatchArgs, session: Arc<TrackerSession>, handle: Handle) -> anyhow::Result<()> {
    let id = args.deposit_id;
    let timeout = session.polling().shutdown_timeout();

    let scheduler = Scheduler::new(session, DepositSource::Ids(vec![id.clone()]), handle);
    scheduler.start()?;

    let view = scheduler.focus(id.clone());
    let mut rx = view.subscribe();
    let mut shown = None;

    let outcome: Option<FocusState> = loop {
        select! {
            res = signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(err = %e, "could not listen for ctrl-c");
                }
                break None;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break Some(view.current());
                }
                let state = rx.borrow_and_update().clone();
                if state.stage != shown {
                    if let (Some(stage), Some(v)) = (state.stage, &state.view) {
                        println!("[{stage}] {}", format_view(&id, v));
                    }
                    shown = state.stage;
                }
                if state.finished {
                    break Some(state);
                }
            }
        }
    };

    view.close(timeout).await;
    scheduler.stop().await;

    match outcome {
        Some(state) if state.finished && state.status.is_none() => {
            bail!("deposit {id} not found")
        }
        _ => Ok(()),
    }
}
