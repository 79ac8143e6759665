//! Event transformers and the context they run in.

pub mod drag_gesture;
pub mod key_buttons;

use inputshift_types::{DeviceInfo, InjectionTarget, ScreenSize};
use tracing::trace;

use crate::gesture::GestureEvent;
use crate::process::ProcessResolver;
use crate::record::SyntheticEvent;
use crate::registry::DeviceRegistry;
use crate::view::EventView;
use crate::{Injector, ScreenProvider};

pub use drag_gesture::{DragGestureConfig, DragGestureTransformer};
pub use key_buttons::{KeyButtonOptions, KeyButtonTransformer};

/// What happens to the original event after a transformer saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Leave it unmodified for the next stage and, finally, the OS.
    Pass,
    /// Drop it. Any replacement has already been posted.
    Suppress,
}

/// One stage of the [`crate::Pipeline`].
pub trait Transformer {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn transform(&mut self, event: &mut EventView<'_>, ctx: &mut TransformContext<'_>) -> Verdict;

    /// A device was detached. Release any state that was started by it.
    fn device_removed(&mut self, _device: &DeviceInfo, _ctx: &mut TransformContext<'_>) {}
}

/// Everything a transformer may touch while handling one event.
pub struct TransformContext<'a> {
    registry: &'a mut DeviceRegistry,
    injector: &'a mut dyn Injector,
    processes: &'a mut dyn ProcessResolver,
    screen: &'a dyn ScreenProvider,
}

impl<'a> TransformContext<'a> {
    pub fn new(
        registry: &'a mut DeviceRegistry,
        injector: &'a mut dyn Injector,
        processes: &'a mut dyn ProcessResolver,
        screen: &'a dyn ScreenProvider,
    ) -> Self {
        Self {
            registry,
            injector,
            processes,
            screen,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DeviceRegistry {
        self.registry
    }

    pub fn processes(&mut self) -> &mut dyn ProcessResolver {
        self.processes
    }

    /// Size of the primary display, or the fallback size when it cannot be
    /// queried.
    pub fn screen(&self) -> ScreenSize {
        self.screen
            .primary_screen()
            .filter(ScreenSize::is_valid)
            .unwrap_or(ScreenSize::FALLBACK)
    }

    /// Post a replacement event, tagged so the pipeline lets it through
    /// untouched when the tap sees it again.
    pub fn post(&mut self, mut event: SyntheticEvent, target: InjectionTarget) {
        EventView::new(&mut event).mark_synthetic();
        trace!(kind = ?event.kind(), ?target, "posting event");
        self.injector.post(event, target);
    }

    /// Post the records of a dock swipe at session level.
    pub fn post_gesture(&mut self, gesture: GestureEvent) {
        for record in gesture.into_records() {
            self.injector.post(record, InjectionTarget::Session);
        }
    }
}

#[cfg(test)]
mod tests {
    use inputshift_types::EventKind;

    use super::*;
    use crate::mock::{FixedScreen, MockHid, MockInjector, StaticProcesses};

    fn screen_of(screen: FixedScreen) -> ScreenSize {
        let mut registry = DeviceRegistry::new(Box::new(MockHid::new()));
        let mut injector = MockInjector::new();
        let mut processes = StaticProcesses::new();
        let ctx = TransformContext::new(&mut registry, &mut injector, &mut processes, &screen);
        ctx.screen()
    }

    #[test]
    fn screen_falls_back_when_unavailable_or_degenerate() {
        assert_eq!(screen_of(FixedScreen::none()), ScreenSize::FALLBACK);
        assert_eq!(
            screen_of(FixedScreen::new(ScreenSize::new(0.0, 900.0))),
            ScreenSize::FALLBACK
        );
        assert_eq!(
            screen_of(FixedScreen::new(ScreenSize::new(2560.0, 1440.0))),
            ScreenSize::new(2560.0, 1440.0)
        );
    }

    #[test]
    fn post_marks_events_but_gestures_stay_unmarked() {
        let mut registry = DeviceRegistry::new(Box::new(MockHid::new()));
        let mut injector = MockInjector::new();
        let handle = injector.handle();
        let mut processes = StaticProcesses::new();
        let screen = FixedScreen::default();
        let mut ctx = TransformContext::new(&mut registry, &mut injector, &mut processes, &screen);

        ctx.post(SyntheticEvent::new(EventKind::LeftMouseDown), InjectionTarget::Hid);
        ctx.post_gesture(GestureEvent::dock_swipe(
            Some(inputshift_types::GestureType::Horizontal),
            inputshift_types::GesturePhase::Began,
            0.1,
            0.0,
        ));

        let mut posted: Vec<SyntheticEvent> =
            handle.posted().into_iter().map(|p| p.event).collect();
        assert_eq!(posted.len(), 3);
        assert!(EventView::new(&mut posted[0]).is_synthetic());
        assert!(!EventView::new(&mut posted[1]).is_synthetic());
        assert!(!EventView::new(&mut posted[2]).is_synthetic());
    }
}
