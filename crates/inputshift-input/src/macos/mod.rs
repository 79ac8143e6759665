//! macOS backend: a CoreGraphics event tap feeding the engine, plus the
//! IOKit HID event system client for device observation.
//!
//! IOKit and CoreGraphics call back through plain C function pointers, so
//! the engine lives in a thread local on the run-loop thread for the
//! lifetime of [`run_event_loop`].

#![allow(unsafe_code)]

mod hid;
mod post;
mod record;
mod sys;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement, CGEventType,
    CallbackResult,
};
use tracing::{info, trace, warn};

pub use hid::{list_devices, HidClient};
pub use post::{BundleResolver, CgInjector, MainDisplay};
pub use record::CgRecord;

use crate::engine::{Backends, Engine};
use crate::error::InputError;
use crate::process::CachedProcessResolver;
use crate::transform::Verdict;

/// How long the run loop runs before the stop flag is checked again.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

thread_local! {
    static ENGINE: RefCell<Option<Engine>> = const { RefCell::new(None) };
}

/// Run `f` against the installed engine.
///
/// Returns `None` when no engine is installed or when called re-entrantly
/// from inside another engine callback.
pub(crate) fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
    ENGINE.with(|cell| {
        let Ok(mut slot) = cell.try_borrow_mut() else {
            trace!("engine busy, dropping callback");
            return None;
        };
        slot.as_mut().map(f)
    })
}

/// The production backends.
pub fn default_backends() -> Backends {
    Backends {
        hid: Box::new(HidClient::new()),
        injector: Box::new(CgInjector),
        screen: Box::new(MainDisplay),
        processes: Box::new(CachedProcessResolver::new(BundleResolver)),
    }
}

fn tapped_event_types() -> Vec<CGEventType> {
    vec![
        CGEventType::KeyDown,
        CGEventType::KeyUp,
        CGEventType::MouseMoved,
        CGEventType::LeftMouseDragged,
        CGEventType::RightMouseDragged,
        CGEventType::OtherMouseDown,
        CGEventType::OtherMouseUp,
        CGEventType::OtherMouseDragged,
    ]
}

/// Build an engine on the current thread and run it until `running` is
/// cleared.
///
/// Blocks. The engine is started before the tap is installed and stopped
/// and dropped on this thread before returning, which closes every device.
pub fn run_event_loop<E>(
    build: impl FnOnce(Backends) -> Result<Engine, E>,
    running: &AtomicBool,
) -> Result<(), E>
where
    E: From<InputError>,
{
    let engine = build(default_backends())?;
    ENGINE.with(|cell| *cell.borrow_mut() = Some(engine));

    let result = run_installed(running);

    let engine = ENGINE.with(|cell| cell.borrow_mut().take());
    drop(engine);
    result.map_err(E::from)
}

fn run_installed(running: &AtomicBool) -> Result<(), InputError> {
    with_engine(Engine::start).unwrap_or(Ok(()))?;

    let disabled = Rc::new(Cell::new(false));
    let tap_disabled = Rc::clone(&disabled);
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        tapped_event_types(),
        move |_proxy, event_type, event| {
            if matches!(
                event_type,
                CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput
            ) {
                tap_disabled.set(true);
                return CallbackResult::Keep;
            }

            let mut record = CgRecord::new(event);
            match with_engine(|engine| engine.handle_event(&mut record)) {
                Some(Verdict::Suppress) => CallbackResult::Drop,
                _ => CallbackResult::Keep,
            }
        },
    )
    .map_err(|()| InputError::TapCreate)?;

    let source = tap
        .mach_port()
        .create_runloop_source(0)
        .map_err(|()| InputError::RunLoopSource)?;
    unsafe {
        CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();
    info!("event tap installed");

    while running.load(Ordering::SeqCst) {
        CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, POLL_INTERVAL, false);
        if disabled.replace(false) {
            warn!("event tap disabled by the system, re-enabling");
            tap.enable();
        }
    }

    with_engine(Engine::stop);
    info!("event loop finished");
    Ok(())
}
