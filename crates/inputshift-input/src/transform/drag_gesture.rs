//! Turns an auxiliary-button drag into a dock swipe.

use inputshift_types::{Axis, DeviceId, DeviceInfo, EventKind, GesturePhase, MouseButton};
use tracing::{debug, trace};

use crate::device::InputDevice;
use crate::gesture::{self, GestureEvent};
use crate::transform::{TransformContext, Transformer, Verdict};
use crate::view::EventView;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGestureConfig {
    /// Button whose drags drive the gesture.
    pub button: MouseButton,
    pub horizontal_sensitivity: f64,
    pub vertical_sensitivity: f64,
}

impl Default for DragGestureConfig {
    fn default() -> Self {
        Self {
            button: MouseButton::CENTER,
            horizontal_sensitivity: 1.0,
            vertical_sensitivity: 1.0,
        }
    }
}

impl DragGestureConfig {
    fn sensitivity(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.horizontal_sensitivity,
            Axis::Vertical => self.vertical_sensitivity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Idle,
    Active {
        axis: Axis,
        origin_offset: f64,
        last_delta: f64,
        /// Device that started the gesture, when it could be resolved.
        device: Option<DeviceId>,
    },
}

/// Converts drags of one auxiliary button into a began / changed / ended
/// (or cancelled) dock swipe.
pub struct DragGestureTransformer {
    config: DragGestureConfig,
    state: State,
}

impl DragGestureTransformer {
    pub fn new(config: DragGestureConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, State::Active { .. })
    }

    /// Axis of the gesture in progress.
    pub fn axis(&self) -> Option<Axis> {
        match self.state {
            State::Idle => None,
            State::Active { axis, .. } => Some(axis),
        }
    }

    fn begin(&mut self, event: &EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        let (delta_x, delta_y) = (event.delta_x(), event.delta_y());
        let axis = match (delta_x, delta_y) {
            (Some(dx), _) if dx != 0 => Axis::Horizontal,
            (_, Some(_)) => Axis::Vertical,
            _ => {
                trace!("drag sample without usable deltas");
                return Verdict::Pass;
            }
        };
        let sensitivity = self.config.sensitivity(axis);
        let Some(origin_offset) =
            gesture::normalize(axis, delta_x, delta_y, ctx.screen(), sensitivity)
        else {
            return Verdict::Pass;
        };

        let device = ctx.registry().resolve(event).map(InputDevice::id);
        debug!(?axis, origin_offset, "gesture began");
        ctx.post_gesture(GestureEvent::dock_swipe(
            Some(axis.into()),
            GesturePhase::Began,
            origin_offset,
            0.0,
        ));
        self.state = State::Active {
            axis,
            origin_offset,
            last_delta: origin_offset,
            device,
        };
        Verdict::Suppress
    }

    /// Fill in the gesture's owner if it could not be resolved when the
    /// gesture began.
    fn adopt_owner(&mut self, event: &EventView<'_>, ctx: &TransformContext<'_>) {
        if let State::Active { device, .. } = &mut self.state {
            if device.is_none() {
                *device = ctx.registry().resolve(event).map(InputDevice::id);
            }
        }
    }

    #[allow(clippy::float_cmp)]
    fn drag(&mut self, event: &EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        self.adopt_owner(event, ctx);
        let State::Active {
            axis,
            origin_offset,
            last_delta,
            ..
        } = &mut self.state
        else {
            return self.begin(event, ctx);
        };

        let sensitivity = self.config.sensitivity(*axis);
        let Some(delta) =
            gesture::normalize(*axis, event.delta_x(), event.delta_y(), ctx.screen(), sensitivity)
        else {
            return Verdict::Suppress;
        };
        if delta == 0.0 {
            return Verdict::Suppress;
        }

        *origin_offset += delta;
        trace!(origin_offset = *origin_offset, delta, "gesture changed");
        ctx.post_gesture(GestureEvent::dock_swipe(
            Some((*axis).into()),
            GesturePhase::Changed,
            *origin_offset,
            *last_delta,
        ));
        *last_delta = delta;
        Verdict::Suppress
    }

    fn release(&mut self, event: &EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        self.adopt_owner(event, ctx);
        let State::Active {
            axis,
            origin_offset,
            last_delta,
            ..
        } = self.state
        else {
            return Verdict::Pass;
        };

        #[allow(clippy::float_cmp)]
        let phase = if origin_offset == last_delta {
            GesturePhase::Cancelled
        } else {
            GesturePhase::Ended
        };
        debug!(?axis, origin_offset, %phase, "gesture finished");
        ctx.post_gesture(GestureEvent::dock_swipe(
            Some(axis.into()),
            phase,
            origin_offset,
            last_delta,
        ));
        self.state = State::Idle;
        Verdict::Suppress
    }
}

impl Transformer for DragGestureTransformer {
    fn name(&self) -> &'static str {
        "drag-gesture"
    }

    fn transform(&mut self, event: &mut EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        let kind = event.kind();
        if !matches!(kind, EventKind::OtherMouseDragged | EventKind::OtherMouseUp) {
            return Verdict::Pass;
        }
        if event.mouse_button() != Some(self.config.button) {
            return Verdict::Pass;
        }

        if kind == EventKind::OtherMouseDragged {
            self.drag(event, ctx)
        } else {
            self.release(event, ctx)
        }
    }

    fn device_removed(&mut self, device: &DeviceInfo, ctx: &mut TransformContext<'_>) {
        let State::Active {
            axis,
            origin_offset,
            last_delta,
            device: owner,
        } = self.state
        else {
            return;
        };
        match owner {
            Some(owner) if owner != device.id => return,
            // Ownerless gestures end with any pointer device.
            None if !device.is_pointer_device() => return,
            _ => {}
        }

        debug!(?axis, device = %device.id, "gesture device detached, cancelling");
        ctx.post_gesture(GestureEvent::dock_swipe(
            Some(axis.into()),
            GesturePhase::Cancelled,
            origin_offset,
            last_delta,
        ));
        self.state = State::Idle;
    }
}
