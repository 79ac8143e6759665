//! Event transformation and device observation engine for inputshift.
//!
//! Every low-level input event delivered by the platform's event tap is
//! wrapped in an [`EventView`] and offered to a [`Pipeline`] of
//! [`Transformer`]s. Transformers may inject synthetic events through an
//! [`Injector`] and either pass the original on or suppress it. The
//! [`DeviceRegistry`] tracks attached HID devices and resolves which one
//! produced a given event.
//!
//! All of it runs on one run-loop thread: nothing in this crate is `Send`
//! and nothing takes a lock. Platform backends live behind the `macos`
//! feature; the `mock` feature provides in-memory backends for tests.

use inputshift_types::{InjectionTarget, ScreenSize};

pub mod device;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod keymap;
pub mod observe;
pub mod pipeline;
pub mod process;
pub mod record;
pub mod registry;
pub mod transform;
pub mod view;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(all(target_os = "macos", feature = "macos"))]
pub mod macos;

pub use device::{HidValue, InputDevice};
pub use engine::{Backends, Engine};
pub use error::InputError;
pub use observe::ObservationToken;
pub use pipeline::Pipeline;
pub use process::{CachedProcessResolver, ProcessResolver};
pub use record::{EventRecord, SyntheticEvent};
pub use registry::{DeviceRegistry, HidBackend, LastActiveChange, ReportChannel};
pub use transform::{TransformContext, Transformer, Verdict};
pub use view::EventView;

/// Posts synthesized events back into the OS event stream.
///
/// Posting is fire-and-forget: there is no acknowledgment and no error path
/// for the caller to handle.
pub trait Injector {
    fn post(&mut self, event: SyntheticEvent, target: InjectionTarget);
}

/// Reports the size of the primary display.
pub trait ScreenProvider {
    /// `None` when no display can be queried.
    fn primary_screen(&self) -> Option<ScreenSize>;
}
