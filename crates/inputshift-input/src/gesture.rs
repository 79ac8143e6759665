//! Synthetic dock swipe gestures.
//!
//! The OS gesture recognizer accepts a dock swipe as a pair of records: a
//! magnify-typed "value" record carrying the phase, running offset, swipe
//! type and exit speed, followed by a gesture-typed "context" record tagged
//! with a synthetic originating process. Both must be posted at session
//! level, in that order.

use inputshift_types::{Axis, EventKind, GesturePhase, GestureType, ScreenSize};

use crate::record::{EventRecord, SyntheticEvent};

/// Process id the gesture recognizer expects on synthetic swipes.
pub const SYNTHETIC_PROCESS_ID: i64 = 33231;

const SYNTHETIC_PROCESS_ID_F64: f64 = 33231.0;

/// Offset covered by a full swipe across one space.
const OFFSET_PER_SPACE: f64 = 2.0;

/// Width of the gap drawn between two spaces.
const SPACE_SEPARATOR_WIDTH: f64 = 63.0;

/// IOHID event type of a dock gesture.
const HID_TYPE_DOCK: i64 = 23;

mod field {
    pub const UNIX_PROCESS_ID: u32 = 41;
    pub const HID_TYPE: u32 = 110;
    pub const DOCK_TYPE: u32 = 123;
    pub const DOCK_ORIGIN_OFFSET: u32 = 124;
    pub const EXIT_SPEED: u32 = 129;
    pub const EXIT_SPEED_2: u32 = 130;
    pub const PHASE: u32 = 132;
    pub const DOCK_TYPE_2: u32 = 165;
}

/// Normalized gesture displacement for one drag sample.
///
/// Horizontal motion is scaled so that one screen width plus the space
/// separator spans a full space switch, and is sign-inverted: dragging right
/// swipes towards the space on the left, as on a trackpad. Vertical motion is
/// scaled by the screen height. Returns `None` when the locked axis has no
/// delta in this sample.
#[allow(clippy::cast_precision_loss)]
pub fn normalize(
    axis: Axis,
    delta_x: Option<i64>,
    delta_y: Option<i64>,
    screen: ScreenSize,
    sensitivity: f64,
) -> Option<f64> {
    match axis {
        Axis::Horizontal => {
            let multiplier = OFFSET_PER_SPACE / (screen.width + SPACE_SEPARATOR_WIDTH);
            delta_x.map(|dx| -(dx as f64) * multiplier * sensitivity)
        }
        Axis::Vertical => {
            let multiplier = 1.0 / screen.height;
            delta_y.map(|dy| dy as f64 * multiplier * sensitivity)
        }
    }
}

/// The records of one dock swipe step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GestureEvent {
    records: Vec<SyntheticEvent>,
}

impl GestureEvent {
    /// Encode one step of a dock swipe.
    ///
    /// Exit speed (`last_delta * 100`) is only attached on the terminal
    /// phases. Without a swipe type the result is empty and posting it does
    /// nothing.
    #[must_use]
    pub fn dock_swipe(
        gesture_type: Option<GestureType>,
        phase: GesturePhase,
        origin_offset: f64,
        last_delta: f64,
    ) -> Self {
        let Some(gesture_type) = gesture_type else {
            return Self::default();
        };

        let mut value = SyntheticEvent::new(EventKind::Magnify);
        value.set_integer_field(field::HID_TYPE, HID_TYPE_DOCK);
        value.set_integer_field(field::PHASE, i64::from(phase.raw()));
        value.set_double_field(field::DOCK_ORIGIN_OFFSET, origin_offset);
        value.set_integer_field(field::UNIX_PROCESS_ID, SYNTHETIC_PROCESS_ID);
        value.set_double_field(field::DOCK_TYPE, f64::from(gesture_type.raw()));
        value.set_double_field(field::DOCK_TYPE_2, f64::from(gesture_type.raw()));

        if phase.is_terminal() {
            let exit_speed = last_delta * 100.0;
            value.set_double_field(field::EXIT_SPEED, exit_speed);
            value.set_double_field(field::EXIT_SPEED_2, exit_speed);
        }

        let mut context = SyntheticEvent::new(EventKind::Gesture);
        context.set_double_field(field::UNIX_PROCESS_ID, SYNTHETIC_PROCESS_ID_F64);

        Self {
            records: vec![value, context],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in posting order.
    pub fn records(&self) -> &[SyntheticEvent] {
        &self.records
    }

    pub fn into_records(self) -> Vec<SyntheticEvent> {
        self.records
    }
}

/// A dock swipe step decoded from a value record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    pub gesture_type: GestureType,
    pub phase: GesturePhase,
    pub origin_offset: f64,
    pub exit_speed: Option<f64>,
}

/// Decode the value record of a synthesized dock swipe.
///
/// Returns `None` for anything that is not a dock swipe value record.
pub fn inspect(record: &dyn EventRecord) -> Option<GestureSample> {
    if EventKind::from_code(record.kind_code()) != EventKind::Magnify {
        return None;
    }
    if record.integer_field(field::HID_TYPE)? != HID_TYPE_DOCK {
        return None;
    }

    let raw_type = record.double_field(field::DOCK_TYPE)?;
    #[allow(clippy::float_cmp)]
    let gesture_type = [
        GestureType::Horizontal,
        GestureType::Vertical,
        GestureType::Pinch,
    ]
    .into_iter()
    .find(|t| f64::from(t.raw()) == raw_type)?;

    let phase = record
        .integer_field(field::PHASE)
        .and_then(|raw| u8::try_from(raw).ok())
        .and_then(|raw| GesturePhase::try_from(raw).ok())?;

    Some(GestureSample {
        gesture_type,
        phase,
        origin_offset: record.double_field(field::DOCK_ORIGIN_OFFSET)?,
        exit_speed: record.double_field(field::EXIT_SPEED),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn horizontal_is_inverted_and_scaled_by_width_plus_separator() {
        let offset = normalize(
            Axis::Horizontal,
            Some(-50),
            None,
            ScreenSize::new(1920.0, 1080.0),
            1.0,
        )
        .unwrap();
        assert!(close(offset, 50.0 * 2.0 / 1983.0));
        assert!((offset - 0.0504).abs() < 1e-4);
    }

    #[test]
    fn vertical_is_scaled_by_height() {
        let offset = normalize(
            Axis::Vertical,
            Some(10),
            Some(54),
            ScreenSize::new(1920.0, 1080.0),
            2.0,
        )
        .unwrap();
        assert!(close(offset, 0.1));
    }

    #[test]
    fn missing_axis_delta_is_none() {
        let screen = ScreenSize::FALLBACK;
        assert_eq!(normalize(Axis::Horizontal, None, Some(3), screen, 1.0), None);
        assert_eq!(normalize(Axis::Vertical, Some(3), None, screen, 1.0), None);
    }

    #[test]
    fn value_record_comes_first() {
        let event = GestureEvent::dock_swipe(
            Some(GestureType::Horizontal),
            GesturePhase::Began,
            0.25,
            0.0,
        );
        let records = event.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), EventKind::Magnify);
        assert_eq!(records[1].kind(), EventKind::Gesture);

        let value = &records[0];
        assert_eq!(value.integer_field(field::HID_TYPE), Some(23));
        assert_eq!(value.integer_field(field::PHASE), Some(1));
        assert_eq!(value.integer_field(field::UNIX_PROCESS_ID), Some(33231));
        assert_eq!(value.double_field(field::DOCK_ORIGIN_OFFSET), Some(0.25));
        assert_eq!(value.double_field(field::DOCK_TYPE), Some(1.0));
        assert_eq!(value.double_field(field::DOCK_TYPE_2), Some(1.0));

        let context = &records[1];
        assert_eq!(context.double_field(field::UNIX_PROCESS_ID), Some(33231.0));
        assert_eq!(context.integer_fields().count(), 0);
    }

    #[test]
    fn exit_speed_only_on_terminal_phases() {
        for phase in [GesturePhase::Began, GesturePhase::Changed] {
            let event = GestureEvent::dock_swipe(Some(GestureType::Vertical), phase, 0.3, 0.1);
            let value = &event.records()[0];
            assert_eq!(value.double_field(field::EXIT_SPEED), None);
            assert_eq!(value.double_field(field::EXIT_SPEED_2), None);
        }

        for phase in [GesturePhase::Ended, GesturePhase::Cancelled] {
            let event = GestureEvent::dock_swipe(Some(GestureType::Vertical), phase, 0.3, 0.1);
            let value = &event.records()[0];
            let speed = value.double_field(field::EXIT_SPEED).unwrap();
            assert!(close(speed, 10.0));
            assert_eq!(value.double_field(field::EXIT_SPEED_2), Some(speed));
        }
    }

    #[test]
    fn unknown_type_is_empty() {
        let event = GestureEvent::dock_swipe(None, GesturePhase::Began, 1.0, 0.0);
        assert!(event.is_empty());
        assert!(event.into_records().is_empty());
    }

    #[test]
    fn inspect_decodes_value_record() {
        let event = GestureEvent::dock_swipe(
            Some(GestureType::Pinch),
            GesturePhase::Ended,
            -0.5,
            -0.02,
        );
        let sample = inspect(&event.records()[0]).unwrap();
        assert_eq!(sample.gesture_type, GestureType::Pinch);
        assert_eq!(sample.phase, GesturePhase::Ended);
        assert!(close(sample.origin_offset, -0.5));
        assert!(close(sample.exit_speed.unwrap(), -2.0));

        assert_eq!(inspect(&event.records()[1]), None);
        assert_eq!(inspect(&SyntheticEvent::new(EventKind::Magnify)), None);
    }
}
