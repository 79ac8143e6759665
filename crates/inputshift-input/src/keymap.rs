//! Mapping between virtual key codes, [`KeyCode`]s and pointer buttons.

use inputshift_types::{KeyCode, MouseButton};

/// Keys that stand in for pointer buttons, in button order.
///
/// Mice that emit keyboard events instead of button events report A-Z and
/// F1-F6 for buttons 0 to 31.
const BUTTON_KEYS: [KeyCode; 32] = [
    KeyCode::KeyA,
    KeyCode::KeyB,
    KeyCode::KeyC,
    KeyCode::KeyD,
    KeyCode::KeyE,
    KeyCode::KeyF,
    KeyCode::KeyG,
    KeyCode::KeyH,
    KeyCode::KeyI,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::KeyM,
    KeyCode::KeyN,
    KeyCode::KeyO,
    KeyCode::KeyP,
    KeyCode::KeyQ,
    KeyCode::KeyR,
    KeyCode::KeyS,
    KeyCode::KeyT,
    KeyCode::KeyU,
    KeyCode::KeyV,
    KeyCode::KeyW,
    KeyCode::KeyX,
    KeyCode::KeyY,
    KeyCode::KeyZ,
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
    KeyCode::F6,
];

/// Pointer button a key stands for.
pub fn mouse_button_for_key(key: KeyCode) -> Option<MouseButton> {
    BUTTON_KEYS
        .iter()
        .position(|&k| k == key)
        .and_then(|index| u32::try_from(index).ok())
        .map(MouseButton)
}

/// Key that stands for a pointer button.
pub fn key_for_mouse_button(button: MouseButton) -> Option<KeyCode> {
    usize::try_from(button.0)
        .ok()
        .and_then(|index| BUTTON_KEYS.get(index).copied())
}

/// Convert a virtual key code to a [`KeyCode`].
#[allow(clippy::too_many_lines)]
pub fn virtual_to_keycode(code: u16) -> KeyCode {
    match code {
        // Letters
        0x00 => KeyCode::KeyA,
        0x0B => KeyCode::KeyB,
        0x08 => KeyCode::KeyC,
        0x02 => KeyCode::KeyD,
        0x0E => KeyCode::KeyE,
        0x03 => KeyCode::KeyF,
        0x05 => KeyCode::KeyG,
        0x04 => KeyCode::KeyH,
        0x22 => KeyCode::KeyI,
        0x26 => KeyCode::KeyJ,
        0x28 => KeyCode::KeyK,
        0x25 => KeyCode::KeyL,
        0x2E => KeyCode::KeyM,
        0x2D => KeyCode::KeyN,
        0x1F => KeyCode::KeyO,
        0x23 => KeyCode::KeyP,
        0x0C => KeyCode::KeyQ,
        0x0F => KeyCode::KeyR,
        0x01 => KeyCode::KeyS,
        0x11 => KeyCode::KeyT,
        0x20 => KeyCode::KeyU,
        0x09 => KeyCode::KeyV,
        0x0D => KeyCode::KeyW,
        0x07 => KeyCode::KeyX,
        0x10 => KeyCode::KeyY,
        0x06 => KeyCode::KeyZ,

        // Numbers
        0x1D => KeyCode::Digit0,
        0x12 => KeyCode::Digit1,
        0x13 => KeyCode::Digit2,
        0x14 => KeyCode::Digit3,
        0x15 => KeyCode::Digit4,
        0x17 => KeyCode::Digit5,
        0x16 => KeyCode::Digit6,
        0x1A => KeyCode::Digit7,
        0x1C => KeyCode::Digit8,
        0x19 => KeyCode::Digit9,

        // Function keys
        0x7A => KeyCode::F1,
        0x78 => KeyCode::F2,
        0x63 => KeyCode::F3,
        0x76 => KeyCode::F4,
        0x60 => KeyCode::F5,
        0x61 => KeyCode::F6,
        0x62 => KeyCode::F7,
        0x64 => KeyCode::F8,
        0x65 => KeyCode::F9,
        0x6D => KeyCode::F10,
        0x67 => KeyCode::F11,
        0x6F => KeyCode::F12,

        // Modifiers
        0x38 => KeyCode::LeftShift,
        0x3C => KeyCode::RightShift,
        0x3B => KeyCode::LeftCtrl,
        0x3E => KeyCode::RightCtrl,
        0x3A => KeyCode::LeftAlt,
        0x3D => KeyCode::RightAlt,
        0x37 => KeyCode::LeftMeta,
        0x36 => KeyCode::RightMeta,
        0x39 => KeyCode::CapsLock,

        // Navigation
        0x24 => KeyCode::Enter,
        0x35 => KeyCode::Escape,
        0x33 => KeyCode::Backspace,
        0x30 => KeyCode::Tab,
        0x31 => KeyCode::Space,
        0x75 => KeyCode::Delete,
        0x73 => KeyCode::Home,
        0x77 => KeyCode::End,
        0x74 => KeyCode::PageUp,
        0x79 => KeyCode::PageDown,
        0x7E => KeyCode::ArrowUp,
        0x7D => KeyCode::ArrowDown,
        0x7B => KeyCode::ArrowLeft,
        0x7C => KeyCode::ArrowRight,

        other => KeyCode::Unknown(other),
    }
}

/// Convert a [`KeyCode`] back to its virtual key code.
#[allow(clippy::too_many_lines)]
pub fn keycode_to_virtual(key: KeyCode) -> u16 {
    match key {
        // Letters
        KeyCode::KeyA => 0x00,
        KeyCode::KeyB => 0x0B,
        KeyCode::KeyC => 0x08,
        KeyCode::KeyD => 0x02,
        KeyCode::KeyE => 0x0E,
        KeyCode::KeyF => 0x03,
        KeyCode::KeyG => 0x05,
        KeyCode::KeyH => 0x04,
        KeyCode::KeyI => 0x22,
        KeyCode::KeyJ => 0x26,
        KeyCode::KeyK => 0x28,
        KeyCode::KeyL => 0x25,
        KeyCode::KeyM => 0x2E,
        KeyCode::KeyN => 0x2D,
        KeyCode::KeyO => 0x1F,
        KeyCode::KeyP => 0x23,
        KeyCode::KeyQ => 0x0C,
        KeyCode::KeyR => 0x0F,
        KeyCode::KeyS => 0x01,
        KeyCode::KeyT => 0x11,
        KeyCode::KeyU => 0x20,
        KeyCode::KeyV => 0x09,
        KeyCode::KeyW => 0x0D,
        KeyCode::KeyX => 0x07,
        KeyCode::KeyY => 0x10,
        KeyCode::KeyZ => 0x06,

        // Numbers
        KeyCode::Digit0 => 0x1D,
        KeyCode::Digit1 => 0x12,
        KeyCode::Digit2 => 0x13,
        KeyCode::Digit3 => 0x14,
        KeyCode::Digit4 => 0x15,
        KeyCode::Digit5 => 0x17,
        KeyCode::Digit6 => 0x16,
        KeyCode::Digit7 => 0x1A,
        KeyCode::Digit8 => 0x1C,
        KeyCode::Digit9 => 0x19,

        // Function keys
        KeyCode::F1 => 0x7A,
        KeyCode::F2 => 0x78,
        KeyCode::F3 => 0x63,
        KeyCode::F4 => 0x76,
        KeyCode::F5 => 0x60,
        KeyCode::F6 => 0x61,
        KeyCode::F7 => 0x62,
        KeyCode::F8 => 0x64,
        KeyCode::F9 => 0x65,
        KeyCode::F10 => 0x6D,
        KeyCode::F11 => 0x67,
        KeyCode::F12 => 0x6F,

        // Modifiers
        KeyCode::LeftShift => 0x38,
        KeyCode::RightShift => 0x3C,
        KeyCode::LeftCtrl => 0x3B,
        KeyCode::RightCtrl => 0x3E,
        KeyCode::LeftAlt => 0x3A,
        KeyCode::RightAlt => 0x3D,
        KeyCode::LeftMeta => 0x37,
        KeyCode::RightMeta => 0x36,
        KeyCode::CapsLock => 0x39,

        // Navigation
        KeyCode::Enter => 0x24,
        KeyCode::Escape => 0x35,
        KeyCode::Backspace => 0x33,
        KeyCode::Tab => 0x30,
        KeyCode::Space => 0x31,
        KeyCode::Delete => 0x75,
        KeyCode::Home => 0x73,
        KeyCode::End => 0x77,
        KeyCode::PageUp => 0x74,
        KeyCode::PageDown => 0x79,
        KeyCode::ArrowUp => 0x7E,
        KeyCode::ArrowDown => 0x7D,
        KeyCode::ArrowLeft => 0x7B,
        KeyCode::ArrowRight => 0x7C,

        KeyCode::Unknown(code) => code,
    }
}
