//! Device registry: attached HID devices and their lifecycle.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use inputshift_types::{DeviceCategory, DeviceId, DeviceInfo};
use tracing::{debug, info, trace, warn};

use crate::device::{HidValue, InputDevice};
use crate::error::InputError;
use crate::observe::{ObservationToken, Observers};
use crate::view::EventView;

/// The HID subsystem as seen by the registry.
///
/// Implementations deliver attach/detach, input and property notifications
/// by calling into the [`crate::Engine`] on the run-loop thread; the registry
/// only calls back for enumeration, sender resolution and device opening.
pub trait HidBackend {
    /// Begin observing matching services and return those already present.
    fn start(&mut self) -> Result<Vec<DeviceInfo>, InputError>;

    /// Stop observing. Called once, after `start` succeeded.
    fn stop(&mut self) {}

    /// Map the sender id carried by a tapped event to a service.
    ///
    /// `None` when the HID subsystem has no service for the sender yet.
    fn service_for_sender(&self, sender_id: u64) -> Option<DeviceId>;

    /// Open a device's report channel.
    fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn ReportChannel>, InputError>;

    /// Ask for change notifications of a service property.
    fn watch_property(&mut self, _property: &str) {}
}

/// An open device session. Dropping it closes the device.
pub trait ReportChannel {
    /// Start delivering raw input reports in addition to element values.
    fn enable_reports(&mut self) {}
}

/// An event seen by the HID event system, before it reaches the event tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidEvent {
    pub sender_id: u64,
    pub event_type: u32,
}

/// Notification that the most recently used device changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastActiveChange {
    pub device: DeviceId,
    /// Display form of the device, e.g. `MX Master 3 (VID=0x046D, PID=0xB023)`.
    pub name: String,
    pub category: DeviceCategory,
}

type AddedObserver = dyn FnMut(&mut InputDevice);
type RemovedObserver = dyn FnMut(&InputDevice);
type PropertyObserver = dyn FnMut(&str);
type EventObserver = dyn FnMut(&InputDevice, &HidEvent);
type LastActiveObserver = dyn FnMut(&LastActiveChange);

/// Tracks attached devices and resolves events to the device that produced
/// them.
///
/// Mutated only from attach/detach callbacks on the run-loop thread. Device
/// references handed out borrow the registry, so nothing can hold on to a
/// device past the callback that looked it up.
pub struct DeviceRegistry {
    backend: Box<dyn HidBackend>,
    started: bool,
    devices: BTreeMap<DeviceId, InputDevice>,
    last_active: Option<DeviceId>,
    added: Observers<AddedObserver>,
    removed: Observers<RemovedObserver>,
    properties: BTreeMap<String, Observers<PropertyObserver>>,
    events: Observers<EventObserver>,
    last_active_changed: Observers<LastActiveObserver>,
}

impl DeviceRegistry {
    pub fn new(backend: Box<dyn HidBackend>) -> Self {
        Self {
            backend,
            started: false,
            devices: BTreeMap::new(),
            last_active: None,
            added: Observers::new(),
            removed: Observers::new(),
            properties: BTreeMap::new(),
            events: Observers::new(),
            last_active_changed: Observers::new(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Start observing devices.
    ///
    /// Device-added observers registered before this call are notified of
    /// every device already present. Calling `start` twice does nothing.
    pub fn start(&mut self) -> Result<(), InputError> {
        if self.started {
            return Ok(());
        }

        let present = self.backend.start()?;
        self.started = true;

        for property in self.properties.keys() {
            self.backend.watch_property(property);
        }

        info!(devices = present.len(), "device observation started");
        for info in present {
            self.attach(info);
        }
        Ok(())
    }

    /// Stop observing devices. Every remaining device is reported removed and
    /// its report channel closed.
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }

        let ids: Vec<DeviceId> = self.devices.keys().copied().collect();
        for id in ids {
            self.detach(id);
        }
        self.backend.stop();
        self.started = false;
        self.last_active = None;
        info!("device observation stopped");
    }

    /// Register a newly matched service.
    ///
    /// A device that fails to open is still registered, without a report
    /// channel. Attaching a device that is already known does nothing.
    pub fn attach(&mut self, info: DeviceInfo) {
        if self.devices.contains_key(&info.id) {
            trace!(id = %info.id, "device already attached");
            return;
        }

        let channel = match self.backend.open(&info) {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(id = %info.id, error = %e, "failed to open device, registering without input");
                None
            }
        };

        let id = info.id;
        let mut device = InputDevice::new(info, channel);
        debug!(%id, device = %device, "device added");
        self.added.notify(|observer| observer(&mut device));
        self.devices.insert(id, device);
    }

    /// Forget a service. Returns the removed device, whose report channel
    /// closes when it is dropped.
    pub fn detach(&mut self, id: DeviceId) -> Option<InputDevice> {
        let device = self.devices.remove(&id)?;

        if self.last_active == Some(id) {
            self.last_active = None;
        }

        debug!(%id, device = %device, "device removed");
        self.removed.notify(|observer| observer(&device));
        Some(device)
    }

    pub fn devices(&self) -> impl Iterator<Item = &InputDevice> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn device(&self, id: DeviceId) -> Option<&InputDevice> {
        self.devices.get(&id)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut InputDevice> {
        self.devices.get_mut(&id)
    }

    pub fn devices_at_location(&self, location_id: u32) -> Vec<&InputDevice> {
        self.devices
            .values()
            .filter(|device| device.conforms_to_location(location_id))
            .collect()
    }

    /// The device that produced a tapped event.
    ///
    /// `None` before `start`, for events without a sender and for senders the
    /// HID subsystem has not mapped yet.
    pub fn resolve(&self, view: &EventView<'_>) -> Option<&InputDevice> {
        if !self.started {
            return None;
        }
        let sender_id = view.sender_id()?;
        let id = self.backend.service_for_sender(sender_id)?;
        self.devices.get(&id)
    }

    pub fn last_active_device(&self) -> Option<&InputDevice> {
        self.last_active.and_then(|id| self.devices.get(&id))
    }

    /// Record that `id` performed an action, notifying observers when the
    /// last active device changes. Unknown devices are ignored.
    pub fn set_last_active(&mut self, id: DeviceId, reason: &str) {
        if self.last_active == Some(id) {
            return;
        }
        let Some(device) = self.devices.get(&id) else {
            return;
        };

        self.last_active = Some(id);
        let change = LastActiveChange {
            device: id,
            name: device.to_string(),
            category: device.category(),
        };
        info!(
            device = %change.name,
            category = %change.category,
            reason,
            "last active device changed"
        );
        self.last_active_changed.notify(|observer| observer(&change));
    }

    pub fn dispatch_input(&self, id: DeviceId, value: HidValue) {
        if let Some(device) = self.devices.get(&id) {
            device.dispatch_input(value);
        }
    }

    pub fn dispatch_report(&self, id: DeviceId, report: &[u8]) {
        if let Some(device) = self.devices.get(&id) {
            device.dispatch_report(report);
        }
    }

    /// Deliver an HID event to event observers, if its sender is known.
    pub fn dispatch_event(&self, event: &HidEvent) {
        let Some(device) = self
            .backend
            .service_for_sender(event.sender_id)
            .and_then(|id| self.devices.get(&id))
        else {
            return;
        };
        self.events.notify(|observer| observer(device, event));
    }

    pub fn property_changed(&self, property: &str) {
        if let Some(observers) = self.properties.get(property) {
            trace!(property, "property changed");
            observers.notify(|observer| observer(property));
        }
    }

    pub fn observe_device_added(
        &mut self,
        observer: impl FnMut(&mut InputDevice) + 'static,
    ) -> ObservationToken {
        self.added.insert(Rc::new(RefCell::new(observer)))
    }

    pub fn observe_device_removed(
        &mut self,
        observer: impl FnMut(&InputDevice) + 'static,
    ) -> ObservationToken {
        self.removed.insert(Rc::new(RefCell::new(observer)))
    }

    /// Observe changes of one service property.
    pub fn observe_property_changed(
        &mut self,
        property: &str,
        observer: impl FnMut(&str) + 'static,
    ) -> ObservationToken {
        if self.started && !self.properties.contains_key(property) {
            self.backend.watch_property(property);
        }
        self.properties
            .entry(property.to_owned())
            .or_default()
            .insert(Rc::new(RefCell::new(observer)))
    }

    pub fn observe_event_received(
        &mut self,
        observer: impl FnMut(&InputDevice, &HidEvent) + 'static,
    ) -> ObservationToken {
        self.events.insert(Rc::new(RefCell::new(observer)))
    }

    pub fn observe_last_active_changed(
        &mut self,
        observer: impl FnMut(&LastActiveChange) + 'static,
    ) -> ObservationToken {
        self.last_active_changed
            .insert(Rc::new(RefCell::new(observer)))
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use inputshift_types::{EventKind, Usage};

    use super::*;
    use crate::mock::MockHid;
    use crate::record::SyntheticEvent;

    fn mouse(id: u64, location: u32) -> DeviceInfo {
        DeviceInfo {
            product: Some("Test Mouse".into()),
            vendor_id: Some(0x046D),
            product_id: Some(0xC077),
            location_id: Some(location),
            usages: vec![Usage::MOUSE],
            ..DeviceInfo::new(DeviceId(id))
        }
    }

    fn keyboard(id: u64, location: u32) -> DeviceInfo {
        DeviceInfo {
            product: Some("Test Keyboard".into()),
            location_id: Some(location),
            usages: vec![Usage::KEYBOARD],
            ..DeviceInfo::new(DeviceId(id))
        }
    }

    #[test]
    fn start_reports_present_devices_to_early_observers() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.add_service(mouse(1, 0x10));
        handle.add_service(keyboard(2, 0x20));

        let mut registry = DeviceRegistry::new(Box::new(hid));
        let added = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&added);
        let _token = registry.observe_device_added(move |device| log.borrow_mut().push(device.id()));

        registry.start().unwrap();
        assert_eq!(*added.borrow(), vec![DeviceId(1), DeviceId(2)]);
        assert_eq!(registry.len(), 2);
        assert_eq!(handle.open_channels(), vec![DeviceId(1), DeviceId(2)]);
    }

    #[test]
    fn attach_is_idempotent() {
        let hid = MockHid::new();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();

        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let _token = registry.observe_device_added(move |_| *counter.borrow_mut() += 1);

        registry.attach(mouse(1, 0x10));
        registry.attach(mouse(1, 0x10));
        assert_eq!(*count.borrow(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn open_failure_still_registers_device() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.fail_open(DeviceId(1));

        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        registry.attach(mouse(1, 0x10));

        let device = registry.device(DeviceId(1)).unwrap();
        assert!(!device.is_open());
        assert!(handle.open_channels().is_empty());
    }

    #[test]
    fn detach_closes_channel_and_notifies() {
        let hid = MockHid::new();
        let handle = hid.handle();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        registry.attach(mouse(1, 0x10));

        let removed = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&removed);
        let _token = registry.observe_device_removed(move |device| log.borrow_mut().push(device.id()));

        let device = registry.detach(DeviceId(1)).unwrap();
        assert_eq!(*removed.borrow(), vec![DeviceId(1)]);
        assert_eq!(handle.open_channels(), vec![DeviceId(1)]);
        drop(device);
        assert!(handle.open_channels().is_empty());

        assert!(registry.detach(DeviceId(1)).is_none());
    }

    #[test]
    fn stop_removes_every_device() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.add_service(mouse(1, 0x10));
        handle.add_service(mouse(2, 0x20));

        let mut registry = DeviceRegistry::new(Box::new(hid));
        let removed = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&removed);
        let _token = registry.observe_device_removed(move |_| *counter.borrow_mut() += 1);

        registry.start().unwrap();
        registry.stop();
        assert_eq!(*removed.borrow(), 2);
        assert!(registry.is_empty());
        assert!(handle.open_channels().is_empty());
        assert!(handle.is_stopped());
    }

    #[test]
    fn resolve_maps_sender_to_device() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.add_service(mouse(7, 0x10));
        handle.map_sender(0xABC, DeviceId(7));

        let mut registry = DeviceRegistry::new(Box::new(hid));
        let mut event = SyntheticEvent::new(EventKind::MouseMoved).with_sender(0xABC);
        assert!(registry.resolve(&EventView::new(&mut event)).is_none());

        registry.start().unwrap();
        let device = registry.resolve(&EventView::new(&mut event)).unwrap();
        assert_eq!(device.id(), DeviceId(7));

        let mut unmapped = SyntheticEvent::new(EventKind::MouseMoved).with_sender(0xDEF);
        assert!(registry.resolve(&EventView::new(&mut unmapped)).is_none());

        let mut anonymous = SyntheticEvent::new(EventKind::MouseMoved);
        assert!(registry.resolve(&EventView::new(&mut anonymous)).is_none());
    }

    #[test]
    fn devices_at_location_filters() {
        let hid = MockHid::new();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        registry.attach(mouse(1, 0x10));
        registry.attach(keyboard(2, 0x10));
        registry.attach(mouse(3, 0x30));

        let ids: Vec<DeviceId> = registry
            .devices_at_location(0x10)
            .iter()
            .map(|device| device.id())
            .collect();
        assert_eq!(ids, vec![DeviceId(1), DeviceId(2)]);
        assert!(registry.devices_at_location(0x99).is_empty());
    }

    #[test]
    fn last_active_notifies_only_on_change() {
        let hid = MockHid::new();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        registry.attach(mouse(1, 0x10));
        registry.attach(keyboard(2, 0x20));

        let changes = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&changes);
        let _token = registry.observe_last_active_changed(move |change| log.borrow_mut().push(change.clone()));

        registry.set_last_active(DeviceId(1), "test");
        registry.set_last_active(DeviceId(1), "test");
        registry.set_last_active(DeviceId(2), "test");
        registry.set_last_active(DeviceId(99), "test");

        let changes = changes.borrow();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].device, DeviceId(1));
        assert_eq!(changes[0].name, "Test Mouse (VID=0x046D, PID=0xC077)");
        assert_eq!(changes[0].category, DeviceCategory::Mouse);
        assert_eq!(changes[1].category, DeviceCategory::Keyboard);
        assert_eq!(registry.last_active_device().map(InputDevice::id), Some(DeviceId(2)));
    }

    #[test]
    fn detaching_last_active_device_clears_it() {
        let hid = MockHid::new();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        registry.attach(mouse(1, 0x10));
        registry.set_last_active(DeviceId(1), "test");

        registry.detach(DeviceId(1));
        assert!(registry.last_active_device().is_none());
    }

    #[test]
    fn property_observers_are_watched_on_start() {
        let hid = MockHid::new();
        let handle = hid.handle();
        let mut registry = DeviceRegistry::new(Box::new(hid));

        let hits = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&hits);
        let _early = registry.observe_property_changed("HIDPointerResolution", move |p| {
            log.borrow_mut().push(p.to_owned());
        });
        assert!(handle.watched_properties().is_empty());

        registry.start().unwrap();
        let _late = registry.observe_property_changed("HIDMouseAcceleration", |_| {});
        assert_eq!(
            handle.watched_properties(),
            vec!["HIDPointerResolution".to_owned(), "HIDMouseAcceleration".to_owned()]
        );

        registry.property_changed("HIDPointerResolution");
        registry.property_changed("Unrelated");
        assert_eq!(*hits.borrow(), vec!["HIDPointerResolution".to_owned()]);
    }

    #[test]
    fn hid_events_reach_observers_for_known_senders() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.add_service(mouse(4, 0x10));
        handle.map_sender(0x44, DeviceId(4));

        let mut registry = DeviceRegistry::new(Box::new(hid));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _token = registry.observe_event_received(move |device, event| {
            log.borrow_mut().push((device.id(), event.event_type));
        });
        registry.start().unwrap();

        registry.dispatch_event(&HidEvent {
            sender_id: 0x44,
            event_type: 2,
        });
        registry.dispatch_event(&HidEvent {
            sender_id: 0x45,
            event_type: 2,
        });
        assert_eq!(*seen.borrow(), vec![(DeviceId(4), 2)]);
    }

    #[test]
    fn added_observers_can_subscribe_to_input() {
        let hid = MockHid::new();
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();

        let values = Rc::new(RefCell::new(Vec::new()));
        let tokens = Rc::new(RefCell::new(Vec::new()));
        let (log, store) = (Rc::clone(&values), Rc::clone(&tokens));
        let _token = registry.observe_device_added(move |device| {
            let log = Rc::clone(&log);
            let token = device.observe_input(move |_, value| log.borrow_mut().push(value.value));
            store.borrow_mut().push(token);
        });

        registry.attach(mouse(1, 0x10));
        registry.dispatch_input(
            DeviceId(1),
            HidValue {
                usage_page: 0x09,
                usage: 0x01,
                value: 1,
            },
        );
        registry.dispatch_input(
            DeviceId(2),
            HidValue {
                usage_page: 0x09,
                usage: 0x01,
                value: 5,
            },
        );
        assert_eq!(*values.borrow(), vec![1]);
    }

    #[test]
    fn first_report_observer_enables_reports() {
        let hid = MockHid::new();
        let handle = hid.handle();
        handle.add_service(mouse(1, 0x10));
        let mut registry = DeviceRegistry::new(Box::new(hid));
        registry.start().unwrap();
        assert!(!handle.reports_enabled(DeviceId(1)));

        let reports = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&reports);
        let _token = registry
            .device_mut(DeviceId(1))
            .unwrap()
            .observe_report(move |_, report| log.borrow_mut().push(report.to_vec()));
        assert!(handle.reports_enabled(DeviceId(1)));

        registry.dispatch_report(DeviceId(1), &[1, 2, 3]);
        assert_eq!(*reports.borrow(), vec![vec![1_u8, 2, 3]]);
    }
}
