//! Raw event records.
//!
//! [`EventRecord`] is the minimal surface a platform event must expose: its
//! type code, location and numbered integer/double fields. Field numbers are
//! only ever spelled out by [`crate::view`] and [`crate::gesture`].

use std::collections::BTreeMap;

use inputshift_types::{EventKind, MouseButton, Point};

/// An opaque low-level input event with numbered fields.
pub trait EventRecord {
    fn kind_code(&self) -> u32;

    fn set_kind_code(&mut self, code: u32);

    fn location(&self) -> Point;

    fn set_location(&mut self, location: Point);

    /// `None` when the record does not carry the field.
    fn integer_field(&self, field: u32) -> Option<i64>;

    fn set_integer_field(&mut self, field: u32, value: i64);

    fn double_field(&self, field: u32) -> Option<f64>;

    fn set_double_field(&mut self, field: u32, value: f64);

    /// Registry id of the HID service that produced the event, if known.
    fn sender_id(&self) -> Option<u64> {
        None
    }
}

/// An event built in memory, either to be posted by an [`crate::Injector`]
/// or to stand in for a tapped event in tests.
///
/// Fields that were never set are absent, which is how the gesture records
/// leave exit speed off their non-terminal phases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyntheticEvent {
    kind: u32,
    location: Point,
    integers: BTreeMap<u32, i64>,
    doubles: BTreeMap<u32, f64>,
    sender_id: Option<u64>,
}

impl SyntheticEvent {
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind: kind.code(),
            ..Self::default()
        }
    }

    /// A pointer button event, as the OS constructor for mouse events builds
    /// it: kind, cursor position and button number.
    #[must_use]
    pub fn mouse(kind: EventKind, location: Point, button: MouseButton) -> Self {
        let mut event = Self::new(kind);
        event.location = location;
        event.integers.insert(
            crate::view::field::MOUSE_EVENT_BUTTON_NUMBER,
            i64::from(button.0),
        );
        event
    }

    #[must_use]
    pub fn at(mut self, location: Point) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_sender(mut self, sender_id: u64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_code(self.kind)
    }

    /// Integer fields in ascending field order.
    pub fn integer_fields(&self) -> impl Iterator<Item = (u32, i64)> + '_ {
        self.integers.iter().map(|(&field, &value)| (field, value))
    }

    /// Double fields in ascending field order.
    pub fn double_fields(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.doubles.iter().map(|(&field, &value)| (field, value))
    }
}

impl EventRecord for SyntheticEvent {
    fn kind_code(&self) -> u32 {
        self.kind
    }

    fn set_kind_code(&mut self, code: u32) {
        self.kind = code;
    }

    fn location(&self) -> Point {
        self.location
    }

    fn set_location(&mut self, location: Point) {
        self.location = location;
    }

    fn integer_field(&self, field: u32) -> Option<i64> {
        self.integers.get(&field).copied()
    }

    fn set_integer_field(&mut self, field: u32, value: i64) {
        self.integers.insert(field, value);
    }

    fn double_field(&self, field: u32) -> Option<f64> {
        self.doubles.get(&field).copied()
    }

    fn set_double_field(&mut self, field: u32, value: f64) {
        self.doubles.insert(field, value);
    }

    fn sender_id(&self) -> Option<u64> {
        self.sender_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_fields_are_absent() {
        let event = SyntheticEvent::new(EventKind::Magnify);
        assert_eq!(event.integer_field(129), None);
        assert_eq!(event.double_field(129), None);
        assert_eq!(event.sender_id(), None);
    }

    #[test]
    fn mouse_constructor_sets_button() {
        let event = SyntheticEvent::mouse(
            EventKind::OtherMouseDown,
            Point::new(10.0, 20.0),
            MouseButton::BACK,
        );
        assert_eq!(event.kind(), EventKind::OtherMouseDown);
        assert_eq!(event.location(), Point::new(10.0, 20.0));
        assert_eq!(event.integer_fields().count(), 1);
    }
}
