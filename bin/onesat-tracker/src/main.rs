use std::sync::Arc;

use anyhow::Context;
use onesat_common::logging;
use onesat_config::Config;
use tokio::runtime::Handle;
use tracing::*;

use crate::{args::Args, cmd::Commands, helpers::*};

mod args;
mod cmd;
mod errors;
mod helpers;

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");

        return Err(e);
    }

    Ok(())
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    // Start runtime for async IO tasks.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("onesat-rt")
        .build()
        .context("init: build rt")?;

    // Init the logging before we do anything else.
    init_logging(runtime.handle())?;

    let config = get_config(&args)?;
    debug!(?config, "loaded config");

    let res = runtime.block_on(run(args.cmd, config, runtime.handle().clone()));

    logging::finalize();
    res
}

async fn run(cmd: Commands, config: Config, handle: Handle) -> anyhow::Result<()> {
    let store = open_store(&config)?;

    match cmd {
        Commands::Pending(args) => cmd::pending::pending(args, store.as_ref()),
        Commands::Status(args) => {
            let session = create_session(&config, store)?;
            cmd::status::status(args, session).await
        }
        Commands::Track(args) => {
            let session = Arc::new(create_session(&config, store)?);
            cmd::track::track(args, session, handle).await
        }
        Commands::Watch(args) => {
            let session = Arc::new(create_session(&config, store)?);
            cmd::watch::watch(args, session, handle).await
        }
    }
}
