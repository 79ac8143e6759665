//! The ordered chain of transformers every tapped event goes through.

use inputshift_types::DeviceInfo;
use tracing::trace;

use crate::transform::{TransformContext, Transformer, Verdict};
use crate::view::EventView;

/// Runs transformers in order until one of them handles the event.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Transformer>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. Stages see events in the order they were pushed.
    pub fn push(&mut self, stage: Box<dyn Transformer>) {
        self.stages.push(stage);
    }

    #[must_use]
    pub fn with(mut self, stage: Box<dyn Transformer>) -> Self {
        self.push(stage);
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Offer an event to each stage in turn.
    ///
    /// Events this crate posted itself are passed through untouched. The
    /// first stage that does not pass the event ends the chain.
    pub fn process(&mut self, event: &mut EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict {
        if event.is_synthetic() {
            trace!(kind = ?event.kind(), "own event, passing");
            return Verdict::Pass;
        }

        for stage in &mut self.stages {
            let verdict = stage.transform(event, ctx);
            if verdict != Verdict::Pass {
                trace!(stage = stage.name(), ?verdict, kind = ?event.kind(), "event handled");
                return verdict;
            }
        }
        Verdict::Pass
    }

    /// Tell every stage that a device went away.
    pub fn device_removed(&mut self, device: &DeviceInfo, ctx: &mut TransformContext<'_>) {
        for stage in &mut self.stages {
            stage.device_removed(device, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use inputshift_types::{DeviceId, EventKind, InjectionTarget, Point};

    use super::*;
    use crate::mock::{FixedScreen, MockHid, MockInjector, StaticProcesses};
    use crate::record::SyntheticEvent;
    use crate::registry::DeviceRegistry;

    /// Records which stages saw an event and answers with a fixed verdict.
    struct Probe {
        name: &'static str,
        verdict: Verdict,
        seen: Rc<RefCell<Vec<&'static str>>>,
        removed: Rc<RefCell<Vec<DeviceId>>>,
    }

    impl Transformer for Probe {
        fn name(&self) -> &'static str {
            self.name
        }

        fn transform(&mut self, _: &mut EventView<'_>, _: &mut TransformContext<'_>) -> Verdict {
            self.seen.borrow_mut().push(self.name);
            self.verdict
        }

        fn device_removed(&mut self, device: &DeviceInfo, _: &mut TransformContext<'_>) {
            self.removed.borrow_mut().push(device.id);
        }
    }

    struct Fixture {
        registry: DeviceRegistry,
        injector: MockInjector,
        processes: StaticProcesses,
        screen: FixedScreen,
        seen: Rc<RefCell<Vec<&'static str>>>,
        removed: Rc<RefCell<Vec<DeviceId>>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: DeviceRegistry::new(Box::new(MockHid::new())),
                injector: MockInjector::new(),
                processes: StaticProcesses::new(),
                screen: FixedScreen::default(),
                seen: Rc::default(),
                removed: Rc::default(),
            }
        }

        fn probe(&self, name: &'static str, verdict: Verdict) -> Box<dyn Transformer> {
            Box::new(Probe {
                name,
                verdict,
                seen: Rc::clone(&self.seen),
                removed: Rc::clone(&self.removed),
            })
        }

        fn run(&mut self, pipeline: &mut Pipeline, mut event: SyntheticEvent) -> Verdict {
            let mut ctx = TransformContext::new(
                &mut self.registry,
                &mut self.injector,
                &mut self.processes,
                &self.screen,
            );
            pipeline.process(&mut EventView::new(&mut event), &mut ctx)
        }
    }

    #[test]
    fn empty_pipeline_passes() {
        let mut fixture = Fixture::new();
        let mut pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(
            fixture.run(&mut pipeline, SyntheticEvent::new(EventKind::KeyDown)),
            Verdict::Pass
        );
    }

    #[test]
    fn first_non_pass_verdict_ends_chain() {
        let mut fixture = Fixture::new();
        let mut pipeline = Pipeline::new()
            .with(fixture.probe("a", Verdict::Pass))
            .with(fixture.probe("b", Verdict::Suppress))
            .with(fixture.probe("c", Verdict::Pass));
        assert_eq!(pipeline.names(), vec!["a", "b", "c"]);

        let verdict = fixture.run(&mut pipeline, SyntheticEvent::new(EventKind::KeyDown));
        assert_eq!(verdict, Verdict::Suppress);
        assert_eq!(*fixture.seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn all_passing_reaches_every_stage() {
        let mut fixture = Fixture::new();
        let mut pipeline = Pipeline::new()
            .with(fixture.probe("a", Verdict::Pass))
            .with(fixture.probe("b", Verdict::Pass));

        let verdict = fixture.run(&mut pipeline, SyntheticEvent::new(EventKind::MouseMoved));
        assert_eq!(verdict, Verdict::Pass);
        assert_eq!(*fixture.seen.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn own_events_skip_every_stage() {
        let mut fixture = Fixture::new();
        let mut pipeline = Pipeline::new().with(fixture.probe("a", Verdict::Suppress));

        let mut posted = SyntheticEvent::mouse(EventKind::LeftMouseDown, Point::default(), inputshift_types::MouseButton::LEFT);
        {
            let mut ctx = TransformContext::new(
                &mut fixture.registry,
                &mut fixture.injector,
                &mut fixture.processes,
                &fixture.screen,
            );
            ctx.post(posted.clone(), InjectionTarget::Hid);
        }
        posted = fixture.injector.handle().posted().remove(0).event;

        assert_eq!(fixture.run(&mut pipeline, posted), Verdict::Pass);
        assert!(fixture.seen.borrow().is_empty());
    }

    #[test]
    fn device_removal_reaches_every_stage() {
        let mut fixture = Fixture::new();
        let mut pipeline = Pipeline::new()
            .with(fixture.probe("a", Verdict::Suppress))
            .with(fixture.probe("b", Verdict::Suppress));

        let info = DeviceInfo::new(DeviceId(5));
        let mut ctx = TransformContext::new(
            &mut fixture.registry,
            &mut fixture.injector,
            &mut fixture.processes,
            &fixture.screen,
        );
        pipeline.device_removed(&info, &mut ctx);
        assert_eq!(*fixture.removed.borrow(), vec![DeviceId(5), DeviceId(5)]);
    }
}
