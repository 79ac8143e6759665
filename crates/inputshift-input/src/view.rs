//! Typed access to an event record's fields.

use inputshift_types::{EventKind, KeyCode, MouseButton, Point};

use crate::keymap;
use crate::record::EventRecord;

/// Event field numbers understood by the event tap.
pub(crate) mod field {
    pub const MOUSE_EVENT_CLICK_STATE: u32 = 1;
    pub const MOUSE_EVENT_BUTTON_NUMBER: u32 = 3;
    pub const MOUSE_EVENT_DELTA_X: u32 = 4;
    pub const MOUSE_EVENT_DELTA_Y: u32 = 5;
    pub const KEYBOARD_EVENT_KEYCODE: u32 = 9;
    pub const EVENT_TARGET_UNIX_PROCESS_ID: u32 = 40;
    pub const EVENT_SOURCE_UNIX_PROCESS_ID: u32 = 41;
    pub const EVENT_SOURCE_USER_DATA: u32 = 42;
}

/// Tag written into the user-data field of every record this crate injects.
const SYNTHETIC_MARKER: i64 = 0x4953_4654;

/// A typed view over one event record.
///
/// Setters mutate the underlying record in place; the view keeps no state
/// beyond the borrow.
pub struct EventView<'a> {
    record: &'a mut dyn EventRecord,
}

impl<'a> EventView<'a> {
    pub fn new(record: &'a mut dyn EventRecord) -> Self {
        Self { record }
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_code(self.record.kind_code())
    }

    pub fn set_kind(&mut self, kind: EventKind) {
        self.record.set_kind_code(kind.code());
    }

    pub fn location(&self) -> Point {
        self.record.location()
    }

    pub fn set_location(&mut self, location: Point) {
        self.record.set_location(location);
    }

    pub fn delta_x(&self) -> Option<i64> {
        self.record.integer_field(field::MOUSE_EVENT_DELTA_X)
    }

    pub fn delta_y(&self) -> Option<i64> {
        self.record.integer_field(field::MOUSE_EVENT_DELTA_Y)
    }

    pub fn set_delta_x(&mut self, delta: i64) {
        self.record
            .set_integer_field(field::MOUSE_EVENT_DELTA_X, delta);
    }

    pub fn set_delta_y(&mut self, delta: i64) {
        self.record
            .set_integer_field(field::MOUSE_EVENT_DELTA_Y, delta);
    }

    /// Pointer button carried by a button event.
    pub fn mouse_button(&self) -> Option<MouseButton> {
        self.record
            .integer_field(field::MOUSE_EVENT_BUTTON_NUMBER)
            .and_then(|raw| u32::try_from(raw).ok())
            .map(MouseButton)
    }

    /// Set the button and rewrite a button event's kind to match it.
    pub fn set_mouse_button(&mut self, button: MouseButton) {
        let kind = button.fixed_kind(self.kind());
        self.set_kind(kind);
        self.record
            .set_integer_field(field::MOUSE_EVENT_BUTTON_NUMBER, i64::from(button.0));
    }

    pub fn set_click_state(&mut self, clicks: i64) {
        self.record
            .set_integer_field(field::MOUSE_EVENT_CLICK_STATE, clicks);
    }

    /// Raw virtual key code of a key event.
    pub fn virtual_key(&self) -> Option<u16> {
        self.record
            .integer_field(field::KEYBOARD_EVENT_KEYCODE)
            .and_then(|raw| u16::try_from(raw).ok())
    }

    pub fn set_virtual_key(&mut self, code: u16) {
        self.record
            .set_integer_field(field::KEYBOARD_EVENT_KEYCODE, i64::from(code));
    }

    pub fn key_code(&self) -> Option<KeyCode> {
        self.virtual_key().map(keymap::virtual_to_keycode)
    }

    /// Pointer button a key event stands for, if its key is mapped.
    pub fn mouse_button_for_key(&self) -> Option<MouseButton> {
        self.key_code().and_then(keymap::mouse_button_for_key)
    }

    /// Process that posted the event. Zero and negative ids read as absent.
    pub fn source_pid(&self) -> Option<i32> {
        self.pid_field(field::EVENT_SOURCE_UNIX_PROCESS_ID)
    }

    /// Process the event is being delivered to.
    pub fn target_pid(&self) -> Option<i32> {
        self.pid_field(field::EVENT_TARGET_UNIX_PROCESS_ID)
    }

    pub fn set_source_pid(&mut self, pid: Option<i32>) {
        self.record.set_integer_field(
            field::EVENT_SOURCE_UNIX_PROCESS_ID,
            i64::from(pid.unwrap_or(0)),
        );
    }

    pub fn set_target_pid(&mut self, pid: Option<i32>) {
        self.record.set_integer_field(
            field::EVENT_TARGET_UNIX_PROCESS_ID,
            i64::from(pid.unwrap_or(0)),
        );
    }

    pub fn sender_id(&self) -> Option<u64> {
        self.record.sender_id()
    }

    /// Whether this record was injected by us.
    pub fn is_synthetic(&self) -> bool {
        self.record.integer_field(field::EVENT_SOURCE_USER_DATA) == Some(SYNTHETIC_MARKER)
    }

    pub fn mark_synthetic(&mut self) {
        self.record
            .set_integer_field(field::EVENT_SOURCE_USER_DATA, SYNTHETIC_MARKER);
    }

    fn pid_field(&self, field: u32) -> Option<i32> {
        self.record
            .integer_field(field)
            .and_then(|raw| i32::try_from(raw).ok())
            .filter(|pid| *pid > 0)
    }
}
