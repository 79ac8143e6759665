//! Raw declarations for the IOKit HID event system and the CoreGraphics
//! calls the safe `core-graphics` wrappers do not expose.
//!
//! Several of these are private SPI that ships in IOKit and SkyLight without
//! a public header.

#![allow(non_camel_case_types, non_snake_case)]

use std::ffi::c_void;

use core_foundation::array::CFArrayRef;
use core_foundation::base::{CFAllocatorRef, CFIndex, CFTypeRef};
use core_foundation::dictionary::{CFDictionaryRef, CFMutableDictionaryRef};
use core_foundation::runloop::CFRunLoopRef;
use core_foundation::string::CFStringRef;
use core_graphics::geometry::CGPoint;

pub type IOHIDEventSystemClientRef = *mut c_void;
pub type IOHIDServiceClientRef = *mut c_void;
pub type IOHIDEventRef = *mut c_void;
pub type IOHIDDeviceRef = *mut c_void;
pub type IOHIDValueRef = *mut c_void;
pub type IOHIDElementRef = *mut c_void;
pub type CGEventRef = *mut c_void;
pub type IOReturn = i32;
pub type io_service_t = u32;
pub type mach_port_t = u32;

pub const K_IO_RETURN_SUCCESS: IOReturn = 0;
pub const K_IO_MAIN_PORT_DEFAULT: mach_port_t = 0;
pub const K_IOHID_OPTIONS_TYPE_NONE: u32 = 0;

pub type IOHIDServiceClientCallback =
    extern "C" fn(target: *mut c_void, refcon: *mut c_void, service: IOHIDServiceClientRef);

pub type IOHIDEventSystemClientEventCallback = extern "C" fn(
    target: *mut c_void,
    refcon: *mut c_void,
    sender: IOHIDServiceClientRef,
    event: IOHIDEventRef,
);

pub type IOHIDEventSystemClientPropertyChangedCallback = extern "C" fn(
    target: *mut c_void,
    context: *mut c_void,
    property: CFStringRef,
    value: CFTypeRef,
);

pub type IOHIDValueCallback =
    extern "C" fn(context: *mut c_void, result: IOReturn, sender: *mut c_void, value: IOHIDValueRef);

pub type IOHIDReportCallback = extern "C" fn(
    context: *mut c_void,
    result: IOReturn,
    sender: *mut c_void,
    report_type: u32,
    report_id: u32,
    report: *mut u8,
    report_length: CFIndex,
);

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    pub fn IOHIDEventSystemClientCreate(allocator: CFAllocatorRef) -> IOHIDEventSystemClientRef;
    pub fn IOHIDEventSystemClientSetMatchingMultiple(
        client: IOHIDEventSystemClientRef,
        matches: CFArrayRef,
    );
    pub fn IOHIDEventSystemClientRegisterDeviceMatchingCallback(
        client: IOHIDEventSystemClientRef,
        callback: IOHIDServiceClientCallback,
        target: *mut c_void,
        refcon: *mut c_void,
    );
    pub fn IOHIDEventSystemClientUnregisterDeviceMatchingCallback(
        client: IOHIDEventSystemClientRef,
        callback: IOHIDServiceClientCallback,
        target: *mut c_void,
        refcon: *mut c_void,
    );
    pub fn IOHIDEventSystemClientRegisterEventCallback(
        client: IOHIDEventSystemClientRef,
        callback: IOHIDEventSystemClientEventCallback,
        target: *mut c_void,
        refcon: *mut c_void,
    );
    pub fn IOHIDEventSystemClientUnregisterEventCallback(
        client: IOHIDEventSystemClientRef,
        callback: IOHIDEventSystemClientEventCallback,
        target: *mut c_void,
        refcon: *mut c_void,
    );
    pub fn IOHIDEventSystemClientRegisterPropertyChangedCallback(
        client: IOHIDEventSystemClientRef,
        property: CFStringRef,
        callback: IOHIDEventSystemClientPropertyChangedCallback,
        target: *mut c_void,
        context: *mut c_void,
    );
    pub fn IOHIDEventSystemClientScheduleWithRunLoop(
        client: IOHIDEventSystemClientRef,
        run_loop: CFRunLoopRef,
        mode: CFStringRef,
    );
    pub fn IOHIDEventSystemClientUnscheduleWithRunLoop(
        client: IOHIDEventSystemClientRef,
        run_loop: CFRunLoopRef,
        mode: CFStringRef,
    );
    pub fn IOHIDEventSystemClientCopyServices(client: IOHIDEventSystemClientRef) -> CFArrayRef;
    pub fn IOHIDEventSystemClientCopyServiceForRegistryID(
        client: IOHIDEventSystemClientRef,
        registry_id: u64,
    ) -> IOHIDServiceClientRef;

    pub fn IOHIDServiceClientRegisterRemovalCallback(
        service: IOHIDServiceClientRef,
        callback: IOHIDServiceClientCallback,
        target: *mut c_void,
        refcon: *mut c_void,
    );
    pub fn IOHIDServiceClientGetRegistryID(service: IOHIDServiceClientRef) -> CFTypeRef;
    pub fn IOHIDServiceClientCopyProperty(
        service: IOHIDServiceClientRef,
        key: CFStringRef,
    ) -> CFTypeRef;
    pub fn IOHIDServiceClientConformsTo(
        service: IOHIDServiceClientRef,
        usage_page: u32,
        usage: u32,
    ) -> u8;

    pub fn IOHIDEventGetSenderID(event: IOHIDEventRef) -> u64;
    pub fn IOHIDEventGetType(event: IOHIDEventRef) -> u32;

    pub fn IORegistryEntryIDMatching(entry_id: u64) -> CFMutableDictionaryRef;
    pub fn IOServiceGetMatchingService(
        main_port: mach_port_t,
        matching: CFDictionaryRef,
    ) -> io_service_t;
    pub fn IOObjectRelease(object: io_service_t) -> IOReturn;

    pub fn IOHIDDeviceCreate(allocator: CFAllocatorRef, service: io_service_t) -> IOHIDDeviceRef;
    pub fn IOHIDDeviceOpen(device: IOHIDDeviceRef, options: u32) -> IOReturn;
    pub fn IOHIDDeviceClose(device: IOHIDDeviceRef, options: u32) -> IOReturn;
    pub fn IOHIDDeviceGetProperty(device: IOHIDDeviceRef, key: CFStringRef) -> CFTypeRef;
    pub fn IOHIDDeviceSetInputValueMatching(device: IOHIDDeviceRef, matching: CFDictionaryRef);
    pub fn IOHIDDeviceRegisterInputValueCallback(
        device: IOHIDDeviceRef,
        callback: IOHIDValueCallback,
        context: *mut c_void,
    );
    pub fn IOHIDDeviceRegisterInputReportCallback(
        device: IOHIDDeviceRef,
        report: *mut u8,
        report_length: CFIndex,
        callback: IOHIDReportCallback,
        context: *mut c_void,
    );
    pub fn IOHIDDeviceScheduleWithRunLoop(
        device: IOHIDDeviceRef,
        run_loop: CFRunLoopRef,
        mode: CFStringRef,
    );
    pub fn IOHIDDeviceUnscheduleFromRunLoop(
        device: IOHIDDeviceRef,
        run_loop: CFRunLoopRef,
        mode: CFStringRef,
    );

    pub fn IOHIDValueGetElement(value: IOHIDValueRef) -> IOHIDElementRef;
    pub fn IOHIDValueGetIntegerValue(value: IOHIDValueRef) -> CFIndex;
    pub fn IOHIDElementGetUsagePage(element: IOHIDElementRef) -> u32;
    pub fn IOHIDElementGetUsage(element: IOHIDElementRef) -> u32;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    pub fn CGEventGetType(event: CGEventRef) -> u32;
    pub fn CGEventSetType(event: CGEventRef, event_type: u32);
    pub fn CGEventSetLocation(event: CGEventRef, location: CGPoint);
    pub fn CGEventCopyIOHIDEvent(event: CGEventRef) -> IOHIDEventRef;
}
