use format_serde_error::SerdeError;
use onesat_backend_client::BackendError;
use onesat_btcio::ClientError;
use onesat_common::logging::LoggingError;
use onesat_db::StoreError;
use onesat_swap_tracker::SwapTrackerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    MalformedConfig(#[from] SerdeError),

    #[error("config: {0}")]
    Deserialize(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(#[from] onesat_config::ConfigError),

    #[error("config override: {0}")]
    Override(#[from] ConfigError),

    #[error("backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("explorer client: {0}")]
    Explorer(#[from] ClientError),

    #[error("swap tracker client: {0}")]
    SwapTracker(#[from] SwapTrackerError),

    #[error("pending store: {0}")]
    Store(#[from] StoreError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Missing `=` in an override string.
    #[error("invalid override: '{0}'")]
    InvalidOverride(String),

    #[error("attempted to traverse non-table at '{0}'")]
    TraverseNonTableAt(String),
}
