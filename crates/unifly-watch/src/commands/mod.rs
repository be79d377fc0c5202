//! Command handlers.

pub mod config_cmd;
pub mod run;
pub mod store;

use std::path::PathBuf;

use unifly_watch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file selected by `--config` (or the default path).
pub fn load(global: &GlobalOpts) -> Result<(Config, PathBuf), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(unifly_watch_config::config_path);
    let config = unifly_watch_config::load_config(Some(&path))
        .map_err(|e| CliError::config(e, &path))?;
    Ok((config, path))
}

/// Database path: `--database` wins over `watch.database`.
pub fn database_path(global: &GlobalOpts, config: &Config) -> PathBuf {
    global
        .database
        .clone()
        .unwrap_or_else(|| config.database_path())
}
