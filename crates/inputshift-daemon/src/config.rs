//! Daemon configuration loaded from TOML.

use inputshift_input::transform::{DragGestureConfig, KeyButtonOptions};
use inputshift_types::{InjectionTarget, MouseButton};
use serde::{Deserialize, Serialize};

use crate::error::DaemonError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub key_buttons: KeyButtonsConfig,
}

impl Config {
    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), DaemonError> {
        for (name, value) in [
            ("horizontal_sensitivity", self.gesture.horizontal_sensitivity),
            ("vertical_sensitivity", self.gesture.vertical_sensitivity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DaemonError::Config(format!(
                    "gesture.{name} must be a positive number, got {value}"
                )));
            }
        }

        if self.gesture.button < MouseButton::CENTER {
            return Err(DaemonError::Config(format!(
                "gesture.button must be an auxiliary button (2 or higher), got {}",
                self.gesture.button.0
            )));
        }

        if self.key_buttons.enabled && self.key_buttons.location_id.is_none() {
            return Err(DaemonError::Config(
                "key_buttons.location_id is required when key_buttons is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Drag-to-gesture stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Auxiliary button whose drag drives the gesture.
    #[serde(default = "default_gesture_button")]
    pub button: MouseButton,
    #[serde(default = "default_sensitivity")]
    pub horizontal_sensitivity: f64,
    #[serde(default = "default_sensitivity")]
    pub vertical_sensitivity: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            button: default_gesture_button(),
            horizontal_sensitivity: default_sensitivity(),
            vertical_sensitivity: default_sensitivity(),
        }
    }
}

impl GestureConfig {
    pub fn transformer_config(&self) -> DragGestureConfig {
        DragGestureConfig {
            button: self.button,
            horizontal_sensitivity: self.horizontal_sensitivity,
            vertical_sensitivity: self.vertical_sensitivity,
        }
    }
}

/// Key-to-button stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyButtonsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Location id of the device whose keys become buttons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<u32>,
    #[serde(default = "default_true")]
    pub device_scoped: bool,
    #[serde(default = "default_true")]
    pub process_scoped: bool,
    #[serde(default)]
    pub target: InjectionTarget,
}

impl Default for KeyButtonsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            location_id: None,
            device_scoped: true,
            process_scoped: true,
            target: InjectionTarget::default(),
        }
    }
}

impl KeyButtonsConfig {
    pub fn transformer_options(&self) -> KeyButtonOptions {
        KeyButtonOptions {
            device_scoped: self.device_scoped,
            process_scoped: self.process_scoped,
            target: self.target,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_gesture_button() -> MouseButton {
    MouseButton::CENTER
}

fn default_sensitivity() -> f64 {
    1.0
}
