//! Config file location and loading.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::error::DaemonError;

/// Load and validate configuration.
///
/// With no explicit path the default location is used, and a missing file
/// there yields the defaults. An explicit path must exist.
pub fn load_config(path: Option<&Path>) -> Result<Config, DaemonError> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => {
            let path = default_config_path();
            if path.exists() {
                read_config(&path)?
            } else {
                info!(path = %path.display(), "no config file found, using defaults");
                Config::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<Config, DaemonError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        DaemonError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let config: Config = toml::from_str(&content)?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Get the default config directory path.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("inputshift")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}
