//! Shared types for inputshift.
//!
//! This crate contains the plain data shared across the inputshift workspace:
//! low-level event kinds, pointer buttons, key codes, gesture phases, device
//! descriptors and screen geometry. Nothing here touches the operating system.

pub mod device;
pub mod event;
pub mod gesture;
pub mod screen;

pub use device::{DeviceCategory, DeviceId, DeviceInfo, Usage};
pub use event::{EventKind, InjectionTarget, KeyCode, MouseButton, Point};
pub use gesture::{Axis, GesturePhase, GestureType, UnknownPhase};
pub use screen::ScreenSize;
