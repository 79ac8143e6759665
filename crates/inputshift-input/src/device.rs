//! Attached input devices.

use std::cell::RefCell;
use std::rc::Rc;

use inputshift_types::{DeviceCategory, DeviceId, DeviceInfo, Usage};

use crate::observe::{ObservationToken, Observers};
use crate::registry::ReportChannel;

/// One HID element value change reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidValue {
    pub usage_page: u32,
    pub usage: u32,
    pub value: i64,
}

type InputObserver = dyn FnMut(&DeviceInfo, HidValue);
type ReportObserver = dyn FnMut(&DeviceInfo, &[u8]);

/// A physical HID device currently attached.
///
/// Owned by the [`crate::DeviceRegistry`]. The report channel, if the device
/// could be opened, is closed when the device is dropped.
pub struct InputDevice {
    info: DeviceInfo,
    channel: Option<Box<dyn ReportChannel>>,
    input_observers: Observers<InputObserver>,
    report_observers: Observers<ReportObserver>,
}

impl InputDevice {
    pub(crate) fn new(info: DeviceInfo, channel: Option<Box<dyn ReportChannel>>) -> Self {
        Self {
            info,
            channel,
            input_observers: Observers::new(),
            report_observers: Observers::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.info.id
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Product name, or `(unknown)`.
    pub fn name(&self) -> &str {
        self.info.product.as_deref().unwrap_or("(unknown)")
    }

    pub fn location_id(&self) -> Option<u32> {
        self.info.location_id
    }

    pub fn vendor_id(&self) -> Option<u32> {
        self.info.vendor_id
    }

    pub fn product_id(&self) -> Option<u32> {
        self.info.product_id
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.info.serial_number.as_deref()
    }

    pub fn button_count(&self) -> Option<u32> {
        self.info.button_count
    }

    pub fn is_pointer_device(&self) -> bool {
        self.info.is_pointer_device()
    }

    pub fn is_key_device(&self) -> bool {
        self.info.is_key_device()
    }

    pub fn category(&self) -> DeviceCategory {
        self.info.category()
    }

    pub fn conforms_to(&self, usage: Usage) -> bool {
        self.info.conforms_to(usage)
    }

    pub fn conforms_to_location(&self, location_id: u32) -> bool {
        self.info.location_id == Some(location_id)
    }

    /// Whether the device's report channel was opened.
    pub fn is_open(&self) -> bool {
        self.channel.is_some()
    }

    /// Observe HID element value changes from this device.
    pub fn observe_input(
        &mut self,
        observer: impl FnMut(&DeviceInfo, HidValue) + 'static,
    ) -> ObservationToken {
        self.input_observers.insert(Rc::new(RefCell::new(observer)))
    }

    /// Observe raw input reports from this device.
    ///
    /// Report delivery is enabled on the channel when the first report
    /// observer registers.
    pub fn observe_report(
        &mut self,
        observer: impl FnMut(&DeviceInfo, &[u8]) + 'static,
    ) -> ObservationToken {
        if let Some(channel) = self.channel.as_mut() {
            channel.enable_reports();
        }
        self.report_observers.insert(Rc::new(RefCell::new(observer)))
    }

    pub(crate) fn dispatch_input(&self, value: HidValue) {
        let info = &self.info;
        self.input_observers.notify(|observer| observer(info, value));
    }

    pub(crate) fn dispatch_report(&self, report: &[u8]) {
        let info = &self.info;
        self.report_observers.notify(|observer| observer(info, report));
    }
}

impl std::fmt::Display for InputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (VID={}, PID={})",
            self.name(),
            HexId(self.info.vendor_id),
            HexId(self.info.product_id)
        )
    }
}

impl std::fmt::Debug for InputDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputDevice")
            .field("info", &self.info)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl PartialEq for InputDevice {
    fn eq(&self, other: &Self) -> bool {
        self.info.id == other.info.id
    }
}

impl Eq for InputDevice {}

struct HexId(Option<u32>);

impl std::fmt::Display for HexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(id) => write!(f, "0x{id:04X}"),
            None => write!(f, "(nil)"),
        }
    }
}
