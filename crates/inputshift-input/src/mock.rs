//! Mock backends for testing.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use inputshift_types::{DeviceId, DeviceInfo, InjectionTarget, ScreenSize};

use crate::error::InputError;
use crate::process::ProcessResolver;
use crate::record::SyntheticEvent;
use crate::registry::{HidBackend, ReportChannel};
use crate::{Injector, ScreenProvider};

// ---------------------------------------------------------------------------
// MockHid
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MockHidState {
    services: Vec<DeviceInfo>,
    senders: HashMap<u64, DeviceId>,
    failing: BTreeSet<DeviceId>,
    open: BTreeSet<DeviceId>,
    reporting: BTreeSet<DeviceId>,
    watched: Vec<String>,
    started: bool,
    stopped: bool,
}

/// In-memory HID subsystem.
///
/// Services added through the handle before `start` are reported as present;
/// later arrivals are delivered by calling `attach` on the registry (or
/// `device_attached` on the engine) directly.
pub struct MockHid {
    state: Arc<Mutex<MockHidState>>,
}

impl Default for MockHid {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHid {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockHidState::default())),
        }
    }

    /// Get a clonable handle for configuring and observing the mock.
    pub fn handle(&self) -> MockHidHandle {
        MockHidHandle {
            state: Arc::clone(&self.state),
        }
    }
}

/// Clonable observer handle for [`MockHid`].
#[derive(Clone)]
pub struct MockHidHandle {
    state: Arc<Mutex<MockHidState>>,
}

impl MockHidHandle {
    pub fn add_service(&self, info: DeviceInfo) {
        self.state.lock().unwrap().services.push(info);
    }

    /// Let events carrying `sender_id` resolve to `device`.
    pub fn map_sender(&self, sender_id: u64, device: DeviceId) {
        self.state.lock().unwrap().senders.insert(sender_id, device);
    }

    /// Make opening `device` fail.
    pub fn fail_open(&self, device: DeviceId) {
        self.state.lock().unwrap().failing.insert(device);
    }

    /// Devices whose report channel is currently open.
    pub fn open_channels(&self) -> Vec<DeviceId> {
        self.state.lock().unwrap().open.iter().copied().collect()
    }

    pub fn reports_enabled(&self, device: DeviceId) -> bool {
        self.state.lock().unwrap().reporting.contains(&device)
    }

    pub fn watched_properties(&self) -> Vec<String> {
        self.state.lock().unwrap().watched.clone()
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().unwrap().started
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().unwrap().stopped
    }
}

impl HidBackend for MockHid {
    fn start(&mut self) -> Result<Vec<DeviceInfo>, InputError> {
        let mut state = self.state.lock().unwrap();
        state.started = true;
        Ok(state.services.clone())
    }

    fn stop(&mut self) {
        self.state.lock().unwrap().stopped = true;
    }

    fn service_for_sender(&self, sender_id: u64) -> Option<DeviceId> {
        self.state.lock().unwrap().senders.get(&sender_id).copied()
    }

    fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn ReportChannel>, InputError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&info.id) {
            return Err(InputError::DeviceOpen(format!("mock refused {}", info.id)));
        }
        state.open.insert(info.id);
        Ok(Box::new(MockChannel {
            device: info.id,
            state: Arc::clone(&self.state),
        }))
    }

    fn watch_property(&mut self, property: &str) {
        self.state.lock().unwrap().watched.push(property.to_owned());
    }
}

struct MockChannel {
    device: DeviceId,
    state: Arc<Mutex<MockHidState>>,
}

impl ReportChannel for MockChannel {
    fn enable_reports(&mut self) {
        self.state.lock().unwrap().reporting.insert(self.device);
    }
}

impl Drop for MockChannel {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.open.remove(&self.device);
            state.reporting.remove(&self.device);
        }
    }
}

// ---------------------------------------------------------------------------
// MockInjector
// ---------------------------------------------------------------------------

/// Recorded post for test observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedEvent {
    pub event: SyntheticEvent,
    pub target: InjectionTarget,
}

/// Mock event injector that records every post.
pub struct MockInjector {
    posted: Arc<Mutex<Vec<PostedEvent>>>,
}

impl Default for MockInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInjector {
    pub fn new() -> Self {
        Self {
            posted: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> MockInjectorHandle {
        MockInjectorHandle {
            posted: Arc::clone(&self.posted),
        }
    }
}

/// Clonable observer handle for [`MockInjector`].
#[derive(Clone)]
pub struct MockInjectorHandle {
    posted: Arc<Mutex<Vec<PostedEvent>>>,
}

impl MockInjectorHandle {
    /// Snapshot of everything posted so far, in order.
    pub fn posted(&self) -> Vec<PostedEvent> {
        self.posted.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.posted.lock().unwrap().clear();
    }
}

impl Injector for MockInjector {
    fn post(&mut self, event: SyntheticEvent, target: InjectionTarget) {
        self.posted
            .lock()
            .unwrap()
            .push(PostedEvent { event, target });
    }
}

// ---------------------------------------------------------------------------
// FixedScreen / StaticProcesses
// ---------------------------------------------------------------------------

/// A primary display of fixed size, or none at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedScreen(Option<ScreenSize>);

impl FixedScreen {
    pub fn new(size: ScreenSize) -> Self {
        Self(Some(size))
    }

    /// No display can be queried.
    pub fn none() -> Self {
        Self(None)
    }
}

impl ScreenProvider for FixedScreen {
    fn primary_screen(&self) -> Option<ScreenSize> {
        self.0
    }
}

/// Fixed pid to bundle identity table.
#[derive(Debug, Clone, Default)]
pub struct StaticProcesses {
    bundles: HashMap<i32, String>,
}

impl StaticProcesses {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, pid: i32, bundle: &str) -> Self {
        self.bundles.insert(pid, bundle.to_owned());
        self
    }
}

impl ProcessResolver for StaticProcesses {
    fn bundle_identifier(&mut self, pid: i32) -> Option<String> {
        self.bundles.get(&pid).cloned()
    }
}
