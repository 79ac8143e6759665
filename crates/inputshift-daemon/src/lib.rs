//! Daemon for inputshift.
//!
//! Loads the configuration, assembles the transform pipeline from it and
//! runs the engine on a dedicated run-loop thread until shutdown, relaying
//! device notifications back to the async side.

pub mod config;
pub mod daemon;
pub mod error;
pub mod setup;

pub use config::Config;
pub use daemon::{build_engine, build_pipeline, Daemon, DaemonEvent, DaemonStatus, EventLoop};
pub use error::DaemonError;
