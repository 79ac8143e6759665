//! The engine: registry, pipeline and output backends on one run loop.

use inputshift_types::{DeviceId, DeviceInfo};
use tracing::{debug, info};

use crate::device::HidValue;
use crate::error::InputError;
use crate::observe::ObservationToken;
use crate::pipeline::Pipeline;
use crate::process::ProcessResolver;
use crate::record::EventRecord;
use crate::registry::{DeviceRegistry, HidBackend, HidEvent};
use crate::transform::{TransformContext, Verdict};
use crate::view::EventView;
use crate::{Injector, ScreenProvider};

/// Platform services the engine runs on.
pub struct Backends {
    pub hid: Box<dyn HidBackend>,
    pub injector: Box<dyn Injector>,
    pub screen: Box<dyn ScreenProvider>,
    pub processes: Box<dyn ProcessResolver>,
}

/// Owns everything that runs on the event-tap thread.
///
/// The platform layer calls one method per callback: tapped events go to
/// [`Engine::handle_event`], HID notifications to the `device_*`,
/// `input_*`, [`Engine::hid_event`] and [`Engine::property_changed`]
/// methods.
pub struct Engine {
    registry: DeviceRegistry,
    pipeline: Pipeline,
    injector: Box<dyn Injector>,
    screen: Box<dyn ScreenProvider>,
    processes: Box<dyn ProcessResolver>,
    tokens: Vec<ObservationToken>,
}

impl Engine {
    pub fn new(backends: Backends, pipeline: Pipeline) -> Self {
        Self {
            registry: DeviceRegistry::new(backends.hid),
            pipeline,
            injector: backends.injector,
            screen: backends.screen,
            processes: backends.processes,
            tokens: Vec::new(),
        }
    }

    /// Start observing devices.
    pub fn start(&mut self) -> Result<(), InputError> {
        info!(stages = ?self.pipeline.names(), "starting engine");
        self.registry.start()
    }

    /// Detach every device, letting each stage release what it holds, and
    /// stop observing.
    pub fn stop(&mut self) {
        let ids: Vec<DeviceId> = self.registry.devices().map(|device| device.id()).collect();
        for id in ids {
            self.device_detached(id);
        }
        self.registry.stop();
        info!("engine stopped");
    }

    /// Run one tapped event through the pipeline.
    pub fn handle_event(&mut self, record: &mut dyn EventRecord) -> Verdict {
        let mut view = EventView::new(record);
        let mut ctx = TransformContext::new(
            &mut self.registry,
            self.injector.as_mut(),
            self.processes.as_mut(),
            self.screen.as_ref(),
        );
        self.pipeline.process(&mut view, &mut ctx)
    }

    pub fn device_attached(&mut self, info: DeviceInfo) {
        self.registry.attach(info);
    }

    pub fn device_detached(&mut self, id: DeviceId) {
        let Some(device) = self.registry.detach(id) else {
            return;
        };
        let mut ctx = TransformContext::new(
            &mut self.registry,
            self.injector.as_mut(),
            self.processes.as_mut(),
            self.screen.as_ref(),
        );
        self.pipeline.device_removed(device.info(), &mut ctx);
        debug!(%id, "device released");
    }

    pub fn input_value(&mut self, id: DeviceId, value: HidValue) {
        self.registry.dispatch_input(id, value);
    }

    pub fn input_report(&mut self, id: DeviceId, report: &[u8]) {
        self.registry.dispatch_report(id, report);
    }

    pub fn hid_event(&mut self, event: HidEvent) {
        self.registry.dispatch_event(&event);
    }

    pub fn property_changed(&mut self, property: &str) {
        self.registry.property_changed(property);
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.registry
    }

    /// Keep an observation alive for as long as the engine.
    pub fn retain(&mut self, token: ObservationToken) {
        self.tokens.push(token);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.tokens.clear();
        if self.registry.is_started() {
            self.stop();
        }
    }
}
