mod config;
mod errors;
mod polling;

pub use config::*;
pub use errors::ConfigError;
pub use polling::{PolicyConfig, PollingConfig};
