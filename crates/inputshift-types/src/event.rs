//! Input event types.
//!
//! Platform-level descriptions of what a tapped or synthesized event is:
//! its kind, the pointer button or key it carries, and where it happened.

use serde::{Deserialize, Serialize};

/// Kind of a low-level input event.
///
/// The numeric codes are the ones the event tap reports; anything this crate
/// has no name for is kept verbatim in [`EventKind::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Null,
    LeftMouseDown,
    LeftMouseUp,
    RightMouseDown,
    RightMouseUp,
    MouseMoved,
    LeftMouseDragged,
    RightMouseDragged,
    KeyDown,
    KeyUp,
    FlagsChanged,
    ScrollWheel,
    OtherMouseDown,
    OtherMouseUp,
    OtherMouseDragged,
    /// Synthetic gesture context record.
    Gesture,
    /// Synthetic gesture value record.
    Magnify,
    TapDisabledByTimeout,
    TapDisabledByUserInput,
    Other(u32),
}

impl EventKind {
    /// Decode a raw event type code.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Null,
            1 => Self::LeftMouseDown,
            2 => Self::LeftMouseUp,
            3 => Self::RightMouseDown,
            4 => Self::RightMouseUp,
            5 => Self::MouseMoved,
            6 => Self::LeftMouseDragged,
            7 => Self::RightMouseDragged,
            10 => Self::KeyDown,
            11 => Self::KeyUp,
            12 => Self::FlagsChanged,
            22 => Self::ScrollWheel,
            25 => Self::OtherMouseDown,
            26 => Self::OtherMouseUp,
            27 => Self::OtherMouseDragged,
            29 => Self::Gesture,
            30 => Self::Magnify,
            0xFFFF_FFFE => Self::TapDisabledByTimeout,
            0xFFFF_FFFF => Self::TapDisabledByUserInput,
            other => Self::Other(other),
        }
    }

    /// Raw event type code.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Null => 0,
            Self::LeftMouseDown => 1,
            Self::LeftMouseUp => 2,
            Self::RightMouseDown => 3,
            Self::RightMouseUp => 4,
            Self::MouseMoved => 5,
            Self::LeftMouseDragged => 6,
            Self::RightMouseDragged => 7,
            Self::KeyDown => 10,
            Self::KeyUp => 11,
            Self::FlagsChanged => 12,
            Self::ScrollWheel => 22,
            Self::OtherMouseDown => 25,
            Self::OtherMouseUp => 26,
            Self::OtherMouseDragged => 27,
            Self::Gesture => 29,
            Self::Magnify => 30,
            Self::TapDisabledByTimeout => 0xFFFF_FFFE,
            Self::TapDisabledByUserInput => 0xFFFF_FFFF,
            Self::Other(code) => code,
        }
    }

    /// Whether this is a button down, up or dragged event for any button.
    #[must_use]
    pub fn is_mouse_button(self) -> bool {
        BUTTON_TRIPLES
            .iter()
            .any(|triple| triple.contains(&self))
    }

    /// Whether the OS disabled the event tap.
    #[must_use]
    pub fn is_tap_disabled(self) -> bool {
        matches!(
            self,
            Self::TapDisabledByTimeout | Self::TapDisabledByUserInput
        )
    }
}

/// Native (primary, secondary, auxiliary) kinds for each button action.
const BUTTON_TRIPLES: [[EventKind; 3]; 3] = [
    [
        EventKind::LeftMouseDown,
        EventKind::RightMouseDown,
        EventKind::OtherMouseDown,
    ],
    [
        EventKind::LeftMouseUp,
        EventKind::RightMouseUp,
        EventKind::OtherMouseUp,
    ],
    [
        EventKind::LeftMouseDragged,
        EventKind::RightMouseDragged,
        EventKind::OtherMouseDragged,
    ],
];

/// A 0-based pointer button number.
///
/// Buttons 0, 1 and 2 are the OS's primary, secondary and middle buttons;
/// every higher number is reported through the auxiliary event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MouseButton(pub u32);

impl MouseButton {
    pub const LEFT: Self = Self(0);
    pub const RIGHT: Self = Self(1);
    pub const CENTER: Self = Self(2);
    pub const BACK: Self = Self(3);
    pub const FORWARD: Self = Self(4);

    /// Rewrite a button event kind so it matches this button.
    ///
    /// `kind` may be any member of a down/up/dragged triple; the result is the
    /// member of the same triple for this button. Kinds outside the triples are
    /// returned unchanged.
    #[must_use]
    pub fn fixed_kind(self, kind: EventKind) -> EventKind {
        let slot = match self.0 {
            0 => 0,
            1 => 1,
            _ => 2,
        };
        BUTTON_TRIPLES
            .iter()
            .find(|triple| triple.contains(&kind))
            .map_or(kind, |triple| triple[slot])
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<button {}>", self.0)
    }
}

/// A point in global display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where a synthesized event is posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectionTarget {
    /// HID level: visible to every session.
    #[default]
    Hid,
    /// Session level: only the current login session observes the event.
    Session,
}

/// Keyboard key.
///
/// Covers the keys the remapping and diagnostics paths care about. Platform
/// backends translate native virtual key codes to and from these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    // Letters
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,

    // Numbers
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,

    // Modifiers
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
    LeftMeta,
    RightMeta,
    CapsLock,

    // Navigation
    Enter,
    Escape,
    Backspace,
    Tab,
    Space,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    /// Fallback for unmapped keys. The value is the raw virtual key code.
    Unknown(u16),
}
