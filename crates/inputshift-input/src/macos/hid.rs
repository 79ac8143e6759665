//! HID services through the IOKit event system client.
//!
//! The client reports pointer and keyboard services as they match and are
//! terminated; each service is opened as an `IOHIDDevice` for its input
//! values and, on demand, its raw input reports. Every callback lands on
//! the run-loop thread and is forwarded to the engine.

use std::ffi::c_void;
use std::ptr;

use core_foundation::array::CFArray;
use core_foundation::base::{kCFAllocatorDefault, CFIndex, CFRelease, CFType, CFTypeRef, TCFType};
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_foundation::string::{CFString, CFStringRef};
use inputshift_types::{DeviceId, DeviceInfo, Usage};
use tracing::{debug, trace};

use super::{sys, with_engine};
use crate::device::HidValue;
use crate::error::InputError;
use crate::registry::{HidBackend, HidEvent, ReportChannel};

/// Services the client is asked to match.
const MATCHED_USAGES: [Usage; 4] = [Usage::MOUSE, Usage::POINTER, Usage::KEYBOARD, Usage::KEYPAD];

/// Report buffer size when the device does not advertise one.
const DEFAULT_REPORT_SIZE: usize = 64;

mod key {
    pub const PRODUCT: &str = "Product";
    pub const VENDOR_ID: &str = "VendorID";
    pub const PRODUCT_ID: &str = "ProductID";
    pub const SERIAL_NUMBER: &str = "SerialNumber";
    pub const LOCATION_ID: &str = "LocationID";
    pub const BUTTON_COUNT: &str = "HIDPointerButtonCount";
    pub const MAX_INPUT_REPORT_SIZE: &str = "MaxInputReportSize";
    pub const DEVICE_USAGE_PAGE: &str = "DeviceUsagePage";
    pub const DEVICE_USAGE: &str = "DeviceUsage";
}

// ---------------------------------------------------------------------------
// Service properties
// ---------------------------------------------------------------------------

fn registry_id(service: sys::IOHIDServiceClientRef) -> Option<u64> {
    if service.is_null() {
        return None;
    }
    let raw = unsafe { sys::IOHIDServiceClientGetRegistryID(service) };
    if raw.is_null() {
        return None;
    }
    let number = unsafe { CFType::wrap_under_get_rule(raw) };
    number
        .downcast::<CFNumber>()?
        .to_i64()
        .and_then(|id| u64::try_from(id).ok())
}

fn property(service: sys::IOHIDServiceClientRef, name: &'static str) -> Option<CFType> {
    let key = CFString::from_static_string(name);
    let raw = unsafe { sys::IOHIDServiceClientCopyProperty(service, key.as_concrete_TypeRef()) };
    if raw.is_null() {
        None
    } else {
        Some(unsafe { CFType::wrap_under_create_rule(raw) })
    }
}

fn string_property(service: sys::IOHIDServiceClientRef, name: &'static str) -> Option<String> {
    property(service, name)?
        .downcast::<CFString>()
        .map(|value| value.to_string())
}

fn u32_property(service: sys::IOHIDServiceClientRef, name: &'static str) -> Option<u32> {
    property(service, name)?
        .downcast::<CFNumber>()?
        .to_i64()
        .and_then(|value| u32::try_from(value).ok())
}

/// Snapshot a service's properties.
fn describe(service: sys::IOHIDServiceClientRef) -> Option<DeviceInfo> {
    let id = DeviceId(registry_id(service)?);
    let usages = MATCHED_USAGES
        .into_iter()
        .filter(|usage| unsafe {
            sys::IOHIDServiceClientConformsTo(service, usage.page, usage.usage) != 0
        })
        .collect();

    Some(DeviceInfo {
        product: string_property(service, key::PRODUCT),
        vendor_id: u32_property(service, key::VENDOR_ID),
        product_id: u32_property(service, key::PRODUCT_ID),
        serial_number: string_property(service, key::SERIAL_NUMBER),
        location_id: u32_property(service, key::LOCATION_ID),
        button_count: u32_property(service, key::BUTTON_COUNT),
        usages,
        ..DeviceInfo::new(id)
    })
}

fn usage_matches() -> CFArray<CFDictionary<CFString, CFNumber>> {
    let matches: Vec<_> = MATCHED_USAGES
        .iter()
        .map(|usage| {
            CFDictionary::from_CFType_pairs(&[
                (
                    CFString::from_static_string(key::DEVICE_USAGE_PAGE),
                    CFNumber::from(i64::from(usage.page)),
                ),
                (
                    CFString::from_static_string(key::DEVICE_USAGE),
                    CFNumber::from(i64::from(usage.usage)),
                ),
            ])
        })
        .collect();
    CFArray::from_CFTypes(&matches)
}

fn create_client() -> Result<sys::IOHIDEventSystemClientRef, InputError> {
    let client = unsafe { sys::IOHIDEventSystemClientCreate(kCFAllocatorDefault) };
    if client.is_null() {
        return Err(InputError::EventSystemClient);
    }
    let matches = usage_matches();
    unsafe { sys::IOHIDEventSystemClientSetMatchingMultiple(client, matches.as_concrete_TypeRef()) };
    Ok(client)
}

/// Every matched service currently present.
fn copy_services(client: sys::IOHIDEventSystemClientRef) -> Vec<sys::IOHIDServiceClientRef> {
    let raw = unsafe { sys::IOHIDEventSystemClientCopyServices(client) };
    if raw.is_null() {
        return Vec::new();
    }
    let services: CFArray<CFType> = unsafe { CFArray::wrap_under_create_rule(raw) };
    services
        .iter()
        .map(|service| service.as_CFTypeRef().cast_mut())
        .collect()
}

/// One-shot listing of the pointer and keyboard services present right now.
pub fn list_devices() -> Result<Vec<DeviceInfo>, InputError> {
    let client = create_client()?;
    let devices = copy_services(client)
        .into_iter()
        .filter_map(describe)
        .collect();
    unsafe { CFRelease(client.cast_const()) };
    Ok(devices)
}

// ---------------------------------------------------------------------------
// HidClient
// ---------------------------------------------------------------------------

/// [`HidBackend`] over an `IOHIDEventSystemClient` scheduled on the current
/// run loop.
pub struct HidClient {
    client: sys::IOHIDEventSystemClientRef,
}

impl Default for HidClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HidClient {
    pub fn new() -> Self {
        Self {
            client: ptr::null_mut(),
        }
    }
}

impl HidBackend for HidClient {
    fn start(&mut self) -> Result<Vec<DeviceInfo>, InputError> {
        let client = create_client()?;
        unsafe {
            sys::IOHIDEventSystemClientRegisterDeviceMatchingCallback(
                client,
                service_matched,
                ptr::null_mut(),
                ptr::null_mut(),
            );
            sys::IOHIDEventSystemClientRegisterEventCallback(
                client,
                event_received,
                ptr::null_mut(),
                ptr::null_mut(),
            );
            sys::IOHIDEventSystemClientScheduleWithRunLoop(
                client,
                CFRunLoop::get_current().as_concrete_TypeRef(),
                kCFRunLoopCommonModes,
            );
        }
        self.client = client;

        let services = copy_services(client);
        for service in &services {
            watch_removal(*service);
        }
        Ok(services.into_iter().filter_map(describe).collect())
    }

    fn stop(&mut self) {
        if self.client.is_null() {
            return;
        }
        unsafe {
            sys::IOHIDEventSystemClientUnregisterDeviceMatchingCallback(
                self.client,
                service_matched,
                ptr::null_mut(),
                ptr::null_mut(),
            );
            sys::IOHIDEventSystemClientUnregisterEventCallback(
                self.client,
                event_received,
                ptr::null_mut(),
                ptr::null_mut(),
            );
            sys::IOHIDEventSystemClientUnscheduleWithRunLoop(
                self.client,
                CFRunLoop::get_current().as_concrete_TypeRef(),
                kCFRunLoopCommonModes,
            );
            CFRelease(self.client.cast_const());
        }
        self.client = ptr::null_mut();
    }

    fn service_for_sender(&self, sender_id: u64) -> Option<DeviceId> {
        if self.client.is_null() {
            return None;
        }
        let raw = unsafe { sys::IOHIDEventSystemClientCopyServiceForRegistryID(self.client, sender_id) };
        if raw.is_null() {
            return None;
        }
        let service = unsafe { CFType::wrap_under_create_rule(raw.cast_const()) };
        registry_id(service.as_CFTypeRef().cast_mut()).map(DeviceId)
    }

    fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn ReportChannel>, InputError> {
        Ok(Box::new(DeviceChannel::open(info.id)?))
    }

    fn watch_property(&mut self, property: &str) {
        if self.client.is_null() {
            return;
        }
        let name = CFString::new(property);
        unsafe {
            sys::IOHIDEventSystemClientRegisterPropertyChangedCallback(
                self.client,
                name.as_concrete_TypeRef(),
                property_changed,
                ptr::null_mut(),
                ptr::null_mut(),
            );
        }
    }
}

impl Drop for HidClient {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// DeviceChannel
// ---------------------------------------------------------------------------

/// An opened `IOHIDDevice`. Closed and unscheduled on drop.
struct DeviceChannel {
    device: sys::IOHIDDeviceRef,
    /// Callback context; its heap address is handed to IOKit.
    context: Box<DeviceId>,
    report: Option<Box<[u8]>>,
}

impl DeviceChannel {
    fn open(id: DeviceId) -> Result<Self, InputError> {
        let matching = unsafe { sys::IORegistryEntryIDMatching(id.0) };
        if matching.is_null() {
            return Err(InputError::DeviceOpen(format!("{id}: no registry entry")));
        }
        // Consumes the matching dictionary.
        let service =
            unsafe { sys::IOServiceGetMatchingService(sys::K_IO_MAIN_PORT_DEFAULT, matching.cast_const()) };
        if service == 0 {
            return Err(InputError::DeviceOpen(format!("{id}: service is gone")));
        }

        let device = unsafe { sys::IOHIDDeviceCreate(kCFAllocatorDefault, service) };
        unsafe { sys::IOObjectRelease(service) };
        if device.is_null() {
            return Err(InputError::DeviceOpen(format!("{id}: not a HID device")));
        }

        let status = unsafe { sys::IOHIDDeviceOpen(device, sys::K_IOHID_OPTIONS_TYPE_NONE) };
        if status != sys::K_IO_RETURN_SUCCESS {
            unsafe { CFRelease(device.cast_const()) };
            return Err(InputError::DeviceOpen(format!("{id}: IOReturn {status:#x}")));
        }

        let channel = Self {
            device,
            context: Box::new(id),
            report: None,
        };
        unsafe {
            sys::IOHIDDeviceSetInputValueMatching(device, ptr::null());
            sys::IOHIDDeviceRegisterInputValueCallback(
                device,
                input_value_received,
                channel.context_ptr(),
            );
            sys::IOHIDDeviceScheduleWithRunLoop(
                device,
                CFRunLoop::get_current().as_concrete_TypeRef(),
                kCFRunLoopCommonModes,
            );
        }
        debug!(%id, "device opened");
        Ok(channel)
    }

    fn context_ptr(&self) -> *mut c_void {
        ptr::addr_of!(*self.context).cast_mut().cast::<c_void>()
    }

    fn max_report_size(&self) -> usize {
        let key = CFString::from_static_string(key::MAX_INPUT_REPORT_SIZE);
        let raw = unsafe { sys::IOHIDDeviceGetProperty(self.device, key.as_concrete_TypeRef()) };
        if raw.is_null() {
            return DEFAULT_REPORT_SIZE;
        }
        unsafe { CFType::wrap_under_get_rule(raw) }
            .downcast::<CFNumber>()
            .and_then(|size| size.to_i64())
            .and_then(|size| usize::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_REPORT_SIZE)
    }
}

impl ReportChannel for DeviceChannel {
    fn enable_reports(&mut self) {
        if self.report.is_some() {
            return;
        }
        let mut buffer = vec![0_u8; self.max_report_size()].into_boxed_slice();
        let Ok(length) = CFIndex::try_from(buffer.len()) else {
            return;
        };
        unsafe {
            sys::IOHIDDeviceRegisterInputReportCallback(
                self.device,
                buffer.as_mut_ptr(),
                length,
                input_report_received,
                self.context_ptr(),
            );
        }
        trace!(id = %self.context, length, "input reports enabled");
        self.report = Some(buffer);
    }
}

impl Drop for DeviceChannel {
    fn drop(&mut self) {
        unsafe {
            sys::IOHIDDeviceUnscheduleFromRunLoop(
                self.device,
                CFRunLoop::get_current().as_concrete_TypeRef(),
                kCFRunLoopCommonModes,
            );
            sys::IOHIDDeviceClose(self.device, sys::K_IOHID_OPTIONS_TYPE_NONE);
            CFRelease(self.device.cast_const());
        }
        debug!(id = %self.context, "device closed");
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

fn watch_removal(service: sys::IOHIDServiceClientRef) {
    unsafe {
        sys::IOHIDServiceClientRegisterRemovalCallback(
            service,
            service_removed,
            ptr::null_mut(),
            ptr::null_mut(),
        );
    }
}

fn context_id(context: *mut c_void) -> Option<DeviceId> {
    unsafe { context.cast::<DeviceId>().as_ref() }.copied()
}

extern "C" fn service_matched(
    _target: *mut c_void,
    _refcon: *mut c_void,
    service: sys::IOHIDServiceClientRef,
) {
    let Some(info) = describe(service) else {
        return;
    };
    watch_removal(service);
    with_engine(|engine| engine.device_attached(info));
}

extern "C" fn service_removed(
    _target: *mut c_void,
    _refcon: *mut c_void,
    service: sys::IOHIDServiceClientRef,
) {
    if let Some(id) = registry_id(service) {
        with_engine(|engine| engine.device_detached(DeviceId(id)));
    }
}

extern "C" fn event_received(
    _target: *mut c_void,
    _refcon: *mut c_void,
    _sender: sys::IOHIDServiceClientRef,
    event: sys::IOHIDEventRef,
) {
    if event.is_null() {
        return;
    }
    let event = HidEvent {
        sender_id: unsafe { sys::IOHIDEventGetSenderID(event) },
        event_type: unsafe { sys::IOHIDEventGetType(event) },
    };
    with_engine(|engine| engine.hid_event(event));
}

extern "C" fn property_changed(
    _target: *mut c_void,
    _context: *mut c_void,
    property: CFStringRef,
    _value: CFTypeRef,
) {
    if property.is_null() {
        return;
    }
    let property = unsafe { CFString::wrap_under_get_rule(property) }.to_string();
    with_engine(|engine| engine.property_changed(&property));
}

extern "C" fn input_value_received(
    context: *mut c_void,
    _result: sys::IOReturn,
    _sender: *mut c_void,
    value: sys::IOHIDValueRef,
) {
    let Some(id) = context_id(context) else {
        return;
    };
    if value.is_null() {
        return;
    }
    let element = unsafe { sys::IOHIDValueGetElement(value) };
    if element.is_null() {
        return;
    }
    let value = HidValue {
        usage_page: unsafe { sys::IOHIDElementGetUsagePage(element) },
        usage: unsafe { sys::IOHIDElementGetUsage(element) },
        value: i64::try_from(unsafe { sys::IOHIDValueGetIntegerValue(value) }).unwrap_or_default(),
    };
    with_engine(|engine| engine.input_value(id, value));
}

extern "C" fn input_report_received(
    context: *mut c_void,
    result: sys::IOReturn,
    _sender: *mut c_void,
    _report_type: u32,
    _report_id: u32,
    report: *mut u8,
    report_length: CFIndex,
) {
    if result != sys::K_IO_RETURN_SUCCESS || report.is_null() {
        return;
    }
    let (Some(id), Ok(length)) = (context_id(context), usize::try_from(report_length)) else {
        return;
    };
    let report = unsafe { std::slice::from_raw_parts(report, length) };
    with_engine(|engine| engine.input_report(id, report));
}
