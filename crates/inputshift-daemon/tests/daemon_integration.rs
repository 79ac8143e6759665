//! Integration tests driving a fully assembled engine and the daemon loop
//! through the mock backends.

use std::time::Duration;

use inputshift_daemon::config::{Config, KeyButtonsConfig};
use inputshift_daemon::{build_engine, Daemon, DaemonError, DaemonEvent, DaemonStatus};
use inputshift_input::gesture::inspect;
use inputshift_input::keymap::keycode_to_virtual;
use inputshift_input::mock::{
    FixedScreen, MockHid, MockHidHandle, MockInjector, MockInjectorHandle, StaticProcesses,
};
use inputshift_input::{Backends, Engine, EventView, SyntheticEvent, Verdict};
use inputshift_types::{
    DeviceCategory, DeviceId, DeviceInfo, EventKind, GesturePhase, GestureType, InjectionTarget,
    KeyCode, MouseButton, Point, ScreenSize, Usage,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

const LOCATION: u32 = 0x1410_0000;
const MOUSE: DeviceId = DeviceId(0x1_0000_0a2b);
const MOUSE_SENDER: u64 = 0x1_0000_0a2b;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_config() -> Config {
    Config {
        key_buttons: KeyButtonsConfig {
            enabled: true,
            location_id: Some(LOCATION),
            process_scoped: false,
            ..KeyButtonsConfig::default()
        },
        ..Config::default()
    }
}

fn gaming_mouse() -> DeviceInfo {
    DeviceInfo {
        product: Some("Gaming Mouse".to_string()),
        vendor_id: Some(0x046D),
        product_id: Some(0xC08B),
        location_id: Some(LOCATION),
        usages: vec![Usage::MOUSE, Usage::KEYBOARD],
        ..DeviceInfo::new(MOUSE)
    }
}

fn mock_backends() -> (Backends, MockHidHandle, MockInjectorHandle) {
    let hid = MockHid::new();
    let hid_handle = hid.handle();
    hid_handle.add_service(gaming_mouse());
    hid_handle.map_sender(MOUSE_SENDER, MOUSE);

    let injector = MockInjector::new();
    let injector_handle = injector.handle();

    let backends = Backends {
        hid: Box::new(hid),
        injector: Box::new(injector),
        screen: Box::new(FixedScreen::new(ScreenSize::new(1920.0, 1080.0))),
        processes: Box::new(StaticProcesses::new()),
    };
    (backends, hid_handle, injector_handle)
}

fn started_engine(config: &Config) -> (Engine, MockHidHandle, MockInjectorHandle) {
    let (backends, hid, injected) = mock_backends();
    let mut engine = build_engine(config, backends).unwrap();
    engine.start().unwrap();
    (engine, hid, injected)
}

fn key(kind: EventKind, code: KeyCode) -> SyntheticEvent {
    let mut event = SyntheticEvent::new(kind)
        .at(Point::new(300.0, 200.0))
        .with_sender(MOUSE_SENDER);
    EventView::new(&mut event).set_virtual_key(keycode_to_virtual(code));
    event
}

fn middle_drag(dx: i64, dy: i64) -> SyntheticEvent {
    let mut event =
        SyntheticEvent::mouse(EventKind::OtherMouseDragged, Point::default(), MouseButton::CENTER)
            .with_sender(MOUSE_SENDER);
    let mut view = EventView::new(&mut event);
    view.set_delta_x(dx);
    view.set_delta_y(dy);
    event
}

fn middle_up() -> SyntheticEvent {
    SyntheticEvent::mouse(EventKind::OtherMouseUp, Point::default(), MouseButton::CENTER)
        .with_sender(MOUSE_SENDER)
}

fn gesture_phases(injected: &MockInjectorHandle) -> Vec<GesturePhase> {
    injected
        .posted()
        .iter()
        .filter_map(|posted| inspect(&posted.event))
        .map(|sample| sample.phase)
        .collect()
}

async fn wait_for_status(
    rx: &mut watch::Receiver<DaemonStatus>,
    timeout: Duration,
    pred: impl Fn(&DaemonStatus) -> bool,
) -> Result<DaemonStatus, &'static str> {
    tokio::time::timeout(timeout, async {
        loop {
            {
                let status = rx.borrow_and_update().clone();
                if pred(&status) {
                    return Ok(status);
                }
            }
            if rx.changed().await.is_err() {
                return Err("status channel closed");
            }
        }
    })
    .await
    .unwrap_or(Err("timed out waiting for status"))
}

#[test]
fn configured_engine_remaps_keys_and_swipes() {
    init_tracing();
    let (mut engine, _hid, injected) = started_engine(&test_config());

    assert_eq!(
        engine.handle_event(&mut key(EventKind::KeyDown, KeyCode::KeyB)),
        Verdict::Suppress
    );
    assert_eq!(
        engine.handle_event(&mut key(EventKind::KeyUp, KeyCode::KeyB)),
        Verdict::Suppress
    );
    let kinds: Vec<EventKind> = injected.posted().iter().map(|p| p.event.kind()).collect();
    assert_eq!(kinds, vec![EventKind::RightMouseDown, EventKind::RightMouseUp]);
    assert!(injected
        .posted()
        .iter()
        .all(|p| p.target == InjectionTarget::Hid));
    injected.clear();

    assert_eq!(engine.handle_event(&mut middle_drag(-40, 2)), Verdict::Suppress);
    assert_eq!(engine.handle_event(&mut middle_drag(-25, 0)), Verdict::Suppress);
    assert_eq!(engine.handle_event(&mut middle_up()), Verdict::Suppress);
    assert_eq!(
        gesture_phases(&injected),
        vec![GesturePhase::Began, GesturePhase::Changed, GesturePhase::Ended]
    );
    let first = inspect(&injected.posted()[0].event).unwrap();
    assert_eq!(first.gesture_type, GestureType::Horizontal);
    assert!(injected
        .posted()
        .iter()
        .all(|p| p.target == InjectionTarget::Session));
}

#[test]
fn unrelated_events_pass_untouched() {
    let (mut engine, _hid, injected) = started_engine(&test_config());

    let mut moved = SyntheticEvent::new(EventKind::MouseMoved).with_sender(MOUSE_SENDER);
    assert_eq!(engine.handle_event(&mut moved), Verdict::Pass);

    let mut back_drag =
        SyntheticEvent::mouse(EventKind::OtherMouseDragged, Point::default(), MouseButton::BACK)
            .with_sender(MOUSE_SENDER);
    assert_eq!(engine.handle_event(&mut back_drag), Verdict::Pass);

    let mut number = key(EventKind::KeyDown, KeyCode::Digit1);
    assert_eq!(engine.handle_event(&mut number), Verdict::Pass);
    assert!(injected.posted().is_empty());
}

#[test]
fn detach_during_active_gesture_cancels_it() {
    init_tracing();
    let (mut engine, hid, injected) = started_engine(&test_config());

    engine.handle_event(&mut middle_drag(0, 30));
    assert_eq!(gesture_phases(&injected), vec![GesturePhase::Began]);

    engine.device_detached(MOUSE);
    assert_eq!(
        gesture_phases(&injected),
        vec![GesturePhase::Began, GesturePhase::Cancelled]
    );
    assert!(hid.open_channels().is_empty());

    // The button release that follows belongs to no gesture anymore.
    assert_eq!(engine.handle_event(&mut middle_up()), Verdict::Pass);
    assert_eq!(gesture_phases(&injected).len(), 2);
}

#[test]
fn detach_releases_buttons_held_through_keys() {
    let (mut engine, _hid, injected) = started_engine(&test_config());

    engine.handle_event(&mut key(EventKind::KeyDown, KeyCode::KeyA));
    engine.handle_event(&mut key(EventKind::KeyDown, KeyCode::KeyD));
    injected.clear();

    engine.device_detached(MOUSE);
    let kinds: Vec<EventKind> = injected.posted().iter().map(|p| p.event.kind()).collect();
    assert_eq!(kinds, vec![EventKind::LeftMouseUp, EventKind::OtherMouseUp]);
}

#[test]
fn invalid_config_is_rejected_before_engine_exists() {
    let mut config = test_config();
    config.key_buttons.location_id = None;
    let (backends, hid, _injected) = mock_backends();
    assert!(matches!(
        build_engine(&config, backends),
        Err(DaemonError::Config(_))
    ));
    assert!(!hid.is_started());
}

#[tokio::test]
async fn daemon_relays_last_active_device() {
    init_tracing();
    let mut daemon = Daemon::new(test_config());
    let mut status = daemon.status_receiver();
    let events = daemon.event_sender();

    let handle = tokio::spawn(async move {
        daemon
            .run_with(|event_loop| {
                let (backends, _hid, _injected) = mock_backends();
                let mut engine = event_loop.prepare(backends)?;
                engine.start()?;
                engine.handle_event(&mut key(EventKind::KeyDown, KeyCode::KeyA));
                while event_loop.is_running() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                engine.stop();
                Ok(())
            })
            .await
    });

    let seen = wait_for_status(&mut status, Duration::from_secs(5), |s| {
        s.last_active.is_some()
    })
    .await
    .unwrap();
    let change = seen.last_active.unwrap();
    assert_eq!(change.device, MOUSE);
    assert_eq!(change.category, DeviceCategory::Mouse);
    assert!(change.name.starts_with("Gaming Mouse (VID=0x046D"), "{}", change.name);
    assert!(seen.running);

    events.send(DaemonEvent::Shutdown).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    assert!(!status.borrow().running);
}

#[tokio::test]
async fn event_loop_failure_stops_daemon() {
    let mut daemon = Daemon::new(Config::default());
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        daemon.run_with(|_| Err(DaemonError::Config("no event tap".to_string()))),
    )
    .await
    .unwrap();
    assert!(matches!(result, Err(DaemonError::Config(_))));
}

#[cfg(not(target_os = "macos"))]
#[tokio::test]
async fn run_reports_unavailable_platform() {
    let mut daemon = Daemon::new(Config::default());
    let result = tokio::time::timeout(Duration::from_secs(5), daemon.run())
        .await
        .unwrap();
    assert!(matches!(
        result,
        Err(DaemonError::Input(inputshift_input::InputError::Unavailable))
    ));
}
