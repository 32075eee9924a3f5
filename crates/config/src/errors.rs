use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyUrl(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("explorer network {0} has no public default, set explorer.base_url")]
    MissingExplorerUrl(String),
}
