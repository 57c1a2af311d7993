pub mod agent;
pub mod chat;
pub mod config_cmd;
pub mod gateway;
pub mod tools;

use std::path::{Path, PathBuf};
use stepwise_config::AppConfig;

/// The config file in use: `--config`, or the default location.
pub fn config_file(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = config_file(explicit);
    AppConfig::load_with_env(&path).map_err(|e| format!("Failed to load config: {e}").into())
}
