//! Output side of the macOS backend: event posting, display geometry and
//! process bundle lookup.

use std::ffi::OsString;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};

use core_foundation::bundle::CFBundle;
use core_foundation::string::CFString;
use core_foundation::url::CFURL;
use core_graphics::display::CGDisplay;
use core_graphics::event::{CGEvent, CGEventTapLocation, CGEventType, CGMouseButton};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use core_graphics::geometry::CGPoint;
use inputshift_types::{InjectionTarget, ScreenSize};
use tracing::warn;

use super::record::CgRecord;
use crate::process::ProcessResolver;
use crate::record::{EventRecord, SyntheticEvent};
use crate::{Injector, ScreenProvider};

const BUNDLE_IDENTIFIER_KEY: &str = "CFBundleIdentifier";

/// Posts events through `CGEventPost`.
#[derive(Debug, Default)]
pub struct CgInjector;

impl CgInjector {
    fn build(event: &SyntheticEvent) -> Option<CGEvent> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState).ok()?;
        let location = event.location();

        // Button events need the mouse constructor for the OS to fill in
        // pointer state; type and button are overwritten below.
        let cg_event = if event.kind().is_mouse_button() {
            CGEvent::new_mouse_event(
                source,
                CGEventType::OtherMouseDown,
                CGPoint::new(location.x, location.y),
                CGMouseButton::Center,
            )
            .ok()?
        } else {
            CGEvent::new(source).ok()?
        };

        let mut record = CgRecord::new(&cg_event);
        record.set_kind_code(event.kind_code());
        record.set_location(location);
        for (field, value) in event.integer_fields() {
            record.set_integer_field(field, value);
        }
        for (field, value) in event.double_fields() {
            record.set_double_field(field, value);
        }
        Some(cg_event)
    }
}

impl Injector for CgInjector {
    fn post(&mut self, event: SyntheticEvent, target: InjectionTarget) {
        let Some(cg_event) = Self::build(&event) else {
            warn!(kind = ?event.kind(), "failed to create event, dropping it");
            return;
        };
        cg_event.post(match target {
            InjectionTarget::Hid => CGEventTapLocation::HID,
            InjectionTarget::Session => CGEventTapLocation::Session,
        });
    }
}

/// Bounds of the main display.
#[derive(Debug, Default)]
pub struct MainDisplay;

impl ScreenProvider for MainDisplay {
    fn primary_screen(&self) -> Option<ScreenSize> {
        let bounds = CGDisplay::main().bounds();
        Some(ScreenSize::new(bounds.size.width, bounds.size.height))
    }
}

/// Resolves a pid to the identifier of the application bundle its executable
/// lives in.
#[derive(Debug, Default)]
pub struct BundleResolver;

impl BundleResolver {
    fn executable_path(pid: i32) -> Option<PathBuf> {
        let capacity = usize::try_from(libc::PROC_PIDPATHINFO_MAXSIZE).ok()?;
        let mut buffer = vec![0_u8; capacity];
        let size = u32::try_from(buffer.len()).ok()?;
        let written = unsafe { libc::proc_pidpath(pid, buffer.as_mut_ptr().cast(), size) };
        let written = usize::try_from(written).ok().filter(|n| *n > 0)?;
        buffer.truncate(written);
        Some(PathBuf::from(OsString::from_vec(buffer)))
    }

    fn identifier_of(bundle_path: &Path) -> Option<String> {
        let url = CFURL::from_path(bundle_path, true)?;
        let bundle = CFBundle::new(url)?;
        let key = CFString::from_static_string(BUNDLE_IDENTIFIER_KEY);
        let info = bundle.info_dictionary();
        let value = info.find(&key)?;
        let identifier = value.downcast::<CFString>()?;
        Some(identifier.to_string())
    }
}

impl ProcessResolver for BundleResolver {
    fn bundle_identifier(&mut self, pid: i32) -> Option<String> {
        let executable = Self::executable_path(pid)?;
        let bundle = executable
            .ancestors()
            .find(|dir| dir.extension().is_some_and(|ext| ext == "app"))?;
        Self::identifier_of(bundle)
    }
}

