//! Daemon errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input error: {0}")]
    Input(#[from] inputshift_input::InputError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
