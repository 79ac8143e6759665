//! [`EventRecord`] over a live `CGEvent`.

use std::ffi::c_void;

use core_foundation::base::CFRelease;
use core_graphics::event::CGEvent;
use core_graphics::geometry::CGPoint;
use foreign_types::ForeignType;
use inputshift_types::Point;

use super::sys;
use crate::record::EventRecord;

/// A tapped or freshly created `CGEvent`.
///
/// CoreGraphics events are reference objects; writes go straight into the
/// event the OS will deliver.
pub struct CgRecord<'a> {
    event: &'a CGEvent,
}

impl<'a> CgRecord<'a> {
    pub fn new(event: &'a CGEvent) -> Self {
        Self { event }
    }

    fn raw(&self) -> sys::CGEventRef {
        self.event.as_ptr().cast::<c_void>()
    }
}

impl EventRecord for CgRecord<'_> {
    fn kind_code(&self) -> u32 {
        unsafe { sys::CGEventGetType(self.raw()) }
    }

    fn set_kind_code(&mut self, code: u32) {
        unsafe { sys::CGEventSetType(self.raw(), code) }
    }

    fn location(&self) -> Point {
        let location = self.event.location();
        Point::new(location.x, location.y)
    }

    fn set_location(&mut self, location: Point) {
        unsafe { sys::CGEventSetLocation(self.raw(), CGPoint::new(location.x, location.y)) }
    }

    fn integer_field(&self, field: u32) -> Option<i64> {
        Some(self.event.get_integer_value_field(field))
    }

    fn set_integer_field(&mut self, field: u32, value: i64) {
        self.event.set_integer_value_field(field, value);
    }

    fn double_field(&self, field: u32) -> Option<f64> {
        Some(self.event.get_double_value_field(field))
    }

    fn set_double_field(&mut self, field: u32, value: f64) {
        self.event.set_double_value_field(field, value);
    }

    fn sender_id(&self) -> Option<u64> {
        let hid_event = unsafe { sys::CGEventCopyIOHIDEvent(self.raw()) };
        if hid_event.is_null() {
            return None;
        }
        let sender = unsafe { sys::IOHIDEventGetSenderID(hid_event) };
        unsafe { CFRelease(hid_event.cast_const()) };
        Some(sender)
    }
}
