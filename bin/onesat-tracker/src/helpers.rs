use std::{fs, path::Path, sync::Arc, time::Duration};

use format_serde_error::SerdeError;
use onesat_backend_client::BackendClient;
use onesat_btcio::{EsploraClient, ExplorerClientConfig};
use onesat_common::logging;
use onesat_config::Config;
use onesat_db::{FilePendingStore, PendingDepositStore};
use onesat_primitives::DepositId;
use onesat_reconciler::{progress_stage, StatusPolicy, TrackerSession};
use onesat_status::DepositView;
use onesat_swap_tracker::HttpSwapTracker;
use tokio::runtime::Handle;
use toml::value::Table;
use tracing::*;

use crate::{
    args::{apply_override, parse_override, Args},
    errors::InitError,
};

pub fn init_logging(rt: &Handle) -> Result<(), InitError> {
    let mut lconfig = logging::LoggerConfig::with_base_name("onesat-tracker");

    // Set the OpenTelemetry URL if set.
    let otlp_url = logging::get_otlp_url_from_env();
    if let Some(url) = &otlp_url {
        lconfig.set_otlp_url(url.clone());
    }

    {
        // the otlp exporter spawns onto the current runtime
        let _g = rt.enter();
        logging::init(lconfig)?;
    }

    // Have to log this after we start the logging formally.
    if let Some(url) = &otlp_url {
        info!(%url, "using OpenTelemetry tracing output");
    }
    Ok(())
}

/// Loads the config file, applies the overrides and validates the result.
pub fn get_config(args: &Args) -> Result<Config, InitError> {
    let mut table = load_configuration(&args.config)?;
    for override_str in args.get_overrides() {
        let (path, value) = parse_override(&override_str)?;
        apply_override(&path, value, &mut table)?;
    }

    let config: Config = toml::Value::Table(table).try_into()?;
    config.validate()?;
    Ok(config)
}

fn load_configuration(path: &Path) -> Result<Table, InitError> {
    let config_str = fs::read_to_string(path)?;
    let table =
        toml::from_str::<Table>(&config_str).map_err(|err| SerdeError::new(config_str, err))?;
    Ok(table)
}

pub fn open_store(config: &Config) -> Result<Arc<FilePendingStore>, InitError> {
    Ok(Arc::new(FilePendingStore::open(&config.store.path)?))
}

/// Builds a session with the HTTP clients described by `config`.
pub fn create_session(
    config: &Config,
    store: Arc<dyn PendingDepositStore>,
) -> Result<TrackerSession, InitError> {
    let backend = BackendClient::new(
        config.backend.url.clone(),
        Duration::from_millis(config.backend.request_timeout_ms),
    )?;

    let explorer_config = ExplorerClientConfig {
        max_retries: config.explorer.max_retries,
        retry_interval: Duration::from_millis(config.explorer.retry_interval_ms),
        request_timeout: Duration::from_millis(config.explorer.request_timeout_ms),
    };
    let explorer = EsploraClient::for_network(
        config.explorer.network,
        config.explorer.base_url.clone(),
        explorer_config,
    )?;
    info!(network = %config.explorer.network, url = %explorer.base_url(), "using block explorer");

    let tracker = HttpSwapTracker::new(
        &config.swap_tracker.url,
        Duration::from_millis(config.swap_tracker.request_timeout_ms),
    )?;

    Ok(TrackerSession::new(
        Arc::new(backend),
        Arc::new(explorer),
        Arc::new(tracker),
        store,
        StatusPolicy::from(&config.policy),
        config.polling.clone(),
    ))
}

/// One line describing a deposit view.
pub fn format_view(id: &DepositId, view: &DepositView) -> String {
    let tx = view
        .tx_id
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{id}  {}  {}  backend={}  tx={tx}  confirmations={}",
        view.status,
        progress_stage(view.status),
        view.backend_status,
        view.confirmations
    )
}
