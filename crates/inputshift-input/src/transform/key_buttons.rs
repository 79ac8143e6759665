//! Remaps keyboard keys sent by a pointing device to pointer buttons.
//!
//! Some mice report their extra buttons as key presses. This stage turns
//! those key presses back into button events, and pointer motion while such
//! a button is held into drags.

use std::collections::BTreeSet;

use inputshift_types::{DeviceId, DeviceInfo, EventKind, InjectionTarget, MouseButton, Point};
use tracing::{debug, trace};

use crate::device::InputDevice;
use crate::record::SyntheticEvent;
use crate::transform::{TransformContext, Transformer, Verdict};
use crate::view::EventView;

const REASON: &str = "mapped key to button";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyButtonOptions {
    /// Only remap events from the device at the bound location. Otherwise
    /// any pointer-capable device is eligible.
    pub device_scoped: bool,
    /// Only remap key presses and motion aimed at a process with a
    /// resolvable bundle identity.
    pub process_scoped: bool,
    /// Where synthesized button events are posted.
    pub target: InjectionTarget,
}

impl Default for KeyButtonOptions {
    fn default() -> Self {
        Self {
            device_scoped: true,
            process_scoped: true,
            target: InjectionTarget::Hid,
        }
    }
}

pub struct KeyButtonTransformer {
    location_id: u32,
    options: KeyButtonOptions,
    pressed: BTreeSet<MouseButton>,
    /// Device the held buttons were pressed through.
    owner: Option<DeviceId>,
    last_location: Point,
    last_dragged: Option<Point>,
}

impl KeyButtonTransformer {
    pub fn new(location_id: u32, options: KeyButtonOptions) -> Self {
        Self {
            location_id,
            options,
            pressed: BTreeSet::new(),
            owner: None,
            last_location: Point::default(),
            last_dragged: None,
        }
    }

    /// Buttons currently held down through their keys.
    pub fn pressed(&self) -> &BTreeSet<MouseButton> {
        &self.pressed
    }

    fn accepts(&self, device: &InputDevice) -> bool {
        if self.options.device_scoped {
            device.conforms_to_location(self.location_id)
        } else {
            device.is_pointer_device()
        }
    }

    fn process_allowed(&self, event: &EventView<'_>, ctx: &mut TransformContext<'_>) -> bool {
        if !self.options.process_scoped {
            return true;
        }
        event
            .target_pid()
            .and_then(|pid| ctx.processes().bundle_identifier(pid))
            .is_some()
    }

    fn key_down(
        &mut self,
        event: &EventView<'_>,
        device: DeviceId,
        ctx: &mut TransformContext<'_>,
    ) -> Verdict {
        let Some(button) = event.mouse_button_for_key() else {
            return Verdict::Pass;
        };
        if self.pressed.contains(&button) {
            trace!(%button, "key repeat ignored");
            return Verdict::Suppress;
        }

        let location = event.location();
        let mut down =
            SyntheticEvent::mouse(button.fixed_kind(EventKind::LeftMouseDown), location, button);
        EventView::new(&mut down).set_click_state(1);

        ctx.registry_mut().set_last_active(device, REASON);
        self.last_dragged = None;
        ctx.post(down, self.options.target);

        debug!(%button, "button down from key");
        self.pressed.insert(button);
        self.owner = Some(device);
        self.last_location = location;
        Verdict::Suppress
    }

    fn key_up(
        &mut self,
        event: &EventView<'_>,
        device: DeviceId,
        ctx: &mut TransformContext<'_>,
    ) -> Verdict {
        let Some(button) = event.mouse_button_for_key() else {
            return Verdict::Pass;
        };
        if !self.pressed.remove(&button) {
            trace!(%button, "key up without matching press");
            return Verdict::Suppress;
        }

        let location = event.location();
        let up = SyntheticEvent::mouse(button.fixed_kind(EventKind::LeftMouseUp), location, button);

        self.last_dragged = None;
        ctx.registry_mut().set_last_active(device, REASON);
        ctx.post(up, self.options.target);

        debug!(%button, "button up from key");
        self.last_location = location;
        if self.pressed.is_empty() {
            self.owner = None;
        }
        Verdict::Suppress
    }

    fn moved(
        &mut self,
        event: &EventView<'_>,
        device: DeviceId,
        ctx: &mut TransformContext<'_>,
    ) -> Verdict {
        let Some(&button) = self.pressed.first() else {
            return Verdict::Pass;
        };

        let location = event.location();
        if self.last_dragged == Some(location) {
            return Verdict::Suppress;
        }

        let mut dragged =
            SyntheticEvent::mouse(button.fixed_kind(EventKind::LeftMouseDragged), location, button);
        let mut view = EventView::new(&mut dragged);
        if let Some(dx) = event.delta_x() {
            view.set_delta_x(dx);
        }
        if let Some(dy) = event.delta_y() {
            view.set_delta_y(dy);
        }

        self.last_dragged = Some(location);
        self.last_location = location;
        ctx.registry_mut().set_last_active(device, REASON);
        ctx.post(dragged, self.options.target);
        Verdict::Suppress
    }
}

impl Transformer for KeyButtonTransformer {
    fn name(&self) -> &'static str {
        "key-buttons"
    }

    fn transform(&mut self, event: &mut EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        let kind = event.kind();
        if !matches!(kind, EventKind::KeyDown | EventKind::KeyUp | EventKind::MouseMoved) {
            return Verdict::Pass;
        }

        let Some(device) = ctx.registry().resolve(event) else {
            trace!(?kind, "event from unresolved device");
            return Verdict::Pass;
        };
        if !self.accepts(device) {
            return Verdict::Pass;
        }
        let device = device.id();

        match kind {
            // releases are honored regardless of the target process so that
            // no button stays held
            EventKind::KeyUp => self.key_up(event, device, ctx),
            _ if !self.process_allowed(event, ctx) => Verdict::Pass,
            EventKind::KeyDown => self.key_down(event, device, ctx),
            _ => self.moved(event, device, ctx),
        }
    }

    fn device_removed(&mut self, device: &DeviceInfo, ctx: &mut TransformContext<'_>) {
        if self.owner != Some(device.id) {
            return;
        }

        let held = std::mem::take(&mut self.pressed);
        debug!(device = %device.id, held = held.len(), "releasing buttons of detached device");
        for button in held {
            let up = SyntheticEvent::mouse(
                button.fixed_kind(EventKind::LeftMouseUp),
                self.last_location,
                button,
            );
            ctx.post(up, self.options.target);
        }
        self.owner = None;
        self.last_dragged = None;
    }
}
