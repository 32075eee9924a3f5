use std::path::PathBuf;

use argh::FromArgs;
use toml::value::Table;

use crate::{cmd::Commands, errors::ConfigError};

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Tracks OneSat deposits until they settle")]
pub struct Args {
    // Config non-overriding args
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: PathBuf,

    // Config overriding args
    /// Explorer network that will override the one in the config toml.
    #[argh(option, description = "bitcoin network of the explorer")]
    pub network: Option<String>,

    /// Pending store path that will override the path in the config toml.
    #[argh(option, short = 'd', description = "pending store file")]
    pub store: Option<PathBuf>,

    /// Other generic overrides to the config toml.
    /// Will be used, for example, as `-o polling.cache_ttl_ms=5000 -o explorer.base_url=http://localhost:3002`
    #[argh(option, short = 'o', description = "generic config overrides")]
    pub overrides: Vec<String>,

    #[argh(subcommand)]
    pub cmd: Commands,
}

impl Args {
    /// Get strings of overrides gathered from args.
    pub fn get_overrides(&self) -> Vec<String> {
        let mut overrides = self.overrides.clone();
        overrides.extend(self.get_direct_overrides());
        overrides
    }

    /// Overrides passed directly as args and not as overrides.
    fn get_direct_overrides(&self) -> Vec<String> {
        let mut overrides = Vec::new();
        if let Some(network) = &self.network {
            overrides.push(format!("explorer.network={network}"));
        }
        if let Some(store) = &self.store {
            overrides.push(format!("store.path={}", store.display()));
        }
        overrides
    }
}

type Override = (String, toml::Value);

/// Parses an override. This first splits the string by '=' to get key and value and then the key
/// is the dotted update path.
pub fn parse_override(override_str: &str) -> Result<Override, ConfigError> {
    let (key, value_str) = override_str
        .split_once('=')
        .ok_or(ConfigError::InvalidOverride(override_str.to_string()))?;
    Ok((key.to_string(), parse_value(value_str)))
}

/// Apply override to config. Sections missing from the file are created, since every section
/// but `backend` and `swap_tracker` is optional.
pub fn apply_override(path: &str, value: toml::Value, table: &mut Table) -> Result<(), ConfigError> {
    match path.split_once('.') {
        None => {
            table.insert(path.to_string(), value);
            Ok(())
        }
        Some((key, rest)) => {
            let entry = table
                .entry(key.to_string())
                .or_insert_with(|| toml::Value::Table(Table::new()));
            match entry.as_table_mut() {
                Some(t) => apply_override(rest, value, t),
                None => Err(ConfigError::TraverseNonTableAt(key.to_string())),
            }
        }
    }
}

/// Parses a string into a toml value. First tries as `i64`, then as `bool` and then defaults to
/// `String`.
fn parse_value(str_value: &str) -> toml::Value {
    str_value
        .parse::<i64>()
        .map(toml::Value::Integer)
        .or_else(|_| str_value.parse::<bool>().map(toml::Value::Boolean))
        .unwrap_or_else(|_| toml::Value::String(str_value.to_string()))
}
