//! Input subsystem errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open device: {0}")]
    DeviceOpen(String),

    #[error("failed to create HID event system client")]
    EventSystemClient,

    #[error("failed to create event tap (is Accessibility permission granted?)")]
    TapCreate,

    #[error("failed to create run loop source")]
    RunLoopSource,

    #[error("backend not available on this platform")]
    Unavailable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
