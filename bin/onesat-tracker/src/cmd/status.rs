use anyhow::bail;
use argh::FromArgs;
use onesat_primitives::DepositId;
use onesat_reconciler::{Now, TrackerSession};

use crate::helpers::format_view;

/// Fetches one deposit and prints its effective status
#[derive(FromArgs, PartialEq, Debug, Clone)]
#[argh(subcommand, name = "status")]
pub struct StatusArgs {
    /// deposit id, hex with or without 0x
    #[argh(positional)]
    pub deposit_id: DepositId,
}

pub async fn status(args: StatusArgs, session: TrackerSession) -> anyhow::Result<()> {
    session.init_resolver().await;
    let res = session.poll_one(&args.deposit_id, Now::now()).await;
    session.stop_resolver().await;

    match res? {
        Some(view) => {
            println!("{}", format_view(&args.deposit_id, &view));
            Ok(())
        }
        None => bail!("deposit {} not found", args.deposit_id),
    }
}
