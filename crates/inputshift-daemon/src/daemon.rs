//! Core daemon orchestration.
//!
//! The engine is not `Send`: it is built, run and dropped on one dedicated
//! run-loop thread. The async side only waits for shutdown and receives
//! notifications the engine relays over a channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use inputshift_input::transform::{DragGestureTransformer, KeyButtonTransformer};
use inputshift_input::{Backends, Engine, LastActiveChange, Pipeline};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::DaemonError;

/// Events processed by the daemon's main loop.
#[derive(Debug)]
pub enum DaemonEvent {
    /// The most recently used input device changed.
    LastActiveDevice(LastActiveChange),
    /// Shutdown signal.
    Shutdown,
}

/// Snapshot of the daemon for observers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaemonStatus {
    pub running: bool,
    pub last_active: Option<LastActiveChange>,
}

/// Assemble the enabled stages in their fixed order: gesture first, then
/// key-to-button.
pub fn build_pipeline(config: &Config) -> Pipeline {
    let mut pipeline = Pipeline::new();
    if config.gesture.enabled {
        pipeline.push(Box::new(DragGestureTransformer::new(
            config.gesture.transformer_config(),
        )));
    }
    if config.key_buttons.enabled {
        if let Some(location_id) = config.key_buttons.location_id {
            pipeline.push(Box::new(KeyButtonTransformer::new(
                location_id,
                config.key_buttons.transformer_options(),
            )));
        }
    }
    pipeline
}

/// Validate `config` and build an engine over `backends`.
pub fn build_engine(config: &Config, backends: Backends) -> Result<Engine, DaemonError> {
    config.validate()?;
    let pipeline = build_pipeline(config);
    info!(stages = ?pipeline.names(), "pipeline assembled");
    Ok(Engine::new(backends, pipeline))
}

/// Handed to the run-loop thread.
pub struct EventLoop {
    config: Config,
    events: mpsc::Sender<DaemonEvent>,
    running: Arc<AtomicBool>,
}

impl EventLoop {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cleared when the daemon shuts down.
    pub fn running(&self) -> &AtomicBool {
        &self.running
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Build the engine and relay its last-active changes to the daemon.
    pub fn prepare(&self, backends: Backends) -> Result<Engine, DaemonError> {
        let mut engine = build_engine(&self.config, backends)?;
        let events = self.events.clone();
        let token = engine
            .registry_mut()
            .observe_last_active_changed(move |change| {
                if let Err(e) = events.try_send(DaemonEvent::LastActiveDevice(change.clone())) {
                    debug!(error = %e, "dropping last-active notification");
                }
            });
        engine.retain(token);
        Ok(engine)
    }
}

#[cfg(all(target_os = "macos", feature = "macos"))]
fn platform_event_loop(event_loop: EventLoop) -> Result<(), DaemonError> {
    inputshift_input::macos::run_event_loop(
        |backends| event_loop.prepare(backends),
        event_loop.running(),
    )
}

#[cfg(not(all(target_os = "macos", feature = "macos")))]
fn platform_event_loop(_event_loop: EventLoop) -> Result<(), DaemonError> {
    Err(inputshift_input::InputError::Unavailable.into())
}

/// The inputshift daemon.
pub struct Daemon {
    config: Config,
    event_tx: mpsc::Sender<DaemonEvent>,
    event_rx: mpsc::Receiver<DaemonEvent>,
    status_tx: watch::Sender<DaemonStatus>,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (status_tx, _) = watch::channel(DaemonStatus::default());
        Self {
            config,
            event_tx,
            event_rx,
            status_tx,
        }
    }

    /// Get a clone of the event sender for feeding events into the daemon.
    pub fn event_sender(&self) -> mpsc::Sender<DaemonEvent> {
        self.event_tx.clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<DaemonStatus> {
        self.status_tx.subscribe()
    }

    /// Run on the platform event loop until Ctrl-C or [`DaemonEvent::Shutdown`].
    pub async fn run(&mut self) -> Result<(), DaemonError> {
        self.run_with(platform_event_loop).await
    }

    /// Run with a custom event loop body on the run-loop thread.
    ///
    /// `event_loop` must return once [`EventLoop::is_running`] turns false.
    /// If it returns earlier, the daemon stops with its result.
    pub async fn run_with<F>(&mut self, event_loop: F) -> Result<(), DaemonError>
    where
        F: FnOnce(EventLoop) -> Result<(), DaemonError> + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let context = EventLoop {
            config: self.config.clone(),
            events: self.event_tx.clone(),
            running: Arc::clone(&running),
        };

        let (exit_tx, mut exit_rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("inputshift-run-loop".to_string())
            .spawn(move || {
                let _ = exit_tx.send(event_loop(context));
            })?;
        self.status_tx.send_modify(|status| status.running = true);
        info!("daemon running");

        let early_exit = loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                    break None;
                }
                exit = &mut exit_rx => {
                    break Some(exit);
                }
                event = self.event_rx.recv() => {
                    match event {
                        Some(DaemonEvent::LastActiveDevice(change)) => {
                            self.handle_last_active(change);
                        }
                        Some(DaemonEvent::Shutdown) | None => {
                            info!("shutting down");
                            break None;
                        }
                    }
                }
            }
        };

        running.store(false, Ordering::SeqCst);
        let exit = match early_exit {
            Some(exit) => exit,
            None => exit_rx.await,
        };
        self.status_tx.send_modify(|status| status.running = false);

        let result = exit.unwrap_or_else(|_| {
            Err(DaemonError::Other(anyhow::anyhow!(
                "run-loop thread exited without a result"
            )))
        });
        info!(ok = result.is_ok(), "daemon stopped");
        result
    }

    fn handle_last_active(&mut self, change: LastActiveChange) {
        info!(
            device = %change.device,
            name = %change.name,
            category = %change.category,
            "last active device changed"
        );
        self.status_tx
            .send_modify(|status| status.last_active = Some(change));
    }
}
