//! inputshift CLI: mouse gesture and key-to-button remapping daemon.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use inputshift_daemon::{setup, Config, Daemon};
use inputshift_types::DeviceInfo;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

#[derive(Parser)]
#[command(
    name = "inputshift",
    about = "Turn mouse drags into gestures and keys into mouse buttons",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the event transformation daemon until interrupted.
    Run {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List attached pointer and keyboard devices.
    Devices,

    /// Print the effective configuration.
    Config {
        /// Path to configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the subscriber. `RUST_LOG` wins over `default_level`; the
/// returned handle can swap the filter once the config is known.
fn init_tracing(default_level: &str) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    handle
}

fn apply_log_level(handle: &FilterHandle, level: &str) -> anyhow::Result<()> {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        handle.reload(EnvFilter::try_new(level)?)?;
    }
    Ok(())
}

fn hex_id(id: Option<u32>) -> String {
    id.map_or_else(|| "(nil)".to_string(), |id| format!("{id:#06X}"))
}

fn print_device(info: &DeviceInfo) {
    println!(
        "{:<14} {:<9} {} (VID={}, PID={}) location={}",
        info.id.to_string(),
        info.category().to_string(),
        info.product.as_deref().unwrap_or("(unknown)"),
        hex_id(info.vendor_id),
        hex_id(info.product_id),
        info.location_id
            .map_or_else(|| "(nil)".to_string(), |location| location.to_string()),
    );
}

#[cfg(all(target_os = "macos", feature = "macos"))]
fn list_devices() -> anyhow::Result<Vec<DeviceInfo>> {
    Ok(inputshift_input::macos::list_devices()?)
}

#[cfg(not(all(target_os = "macos", feature = "macos")))]
fn list_devices() -> anyhow::Result<Vec<DeviceInfo>> {
    Err(inputshift_input::InputError::Unavailable.into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let filter = init_tracing("info");
            let config = setup::load_config(config.as_deref())?;
            apply_log_level(&filter, &config.daemon.log_level)?;
            tracing::info!(
                gesture = config.gesture.enabled,
                key_buttons = config.key_buttons.enabled,
                "starting inputshift daemon"
            );
            let mut daemon = Daemon::new(config);
            daemon.run().await?;
        }
        Commands::Devices => {
            let _ = init_tracing("warn");
            let mut devices = list_devices()?;
            devices.sort_by_key(|info| info.id);
            if devices.is_empty() {
                println!("No pointer or keyboard devices found.");
            }
            for info in &devices {
                print_device(info);
            }
        }
        Commands::Config { config } => {
            let path = config.clone().unwrap_or_else(setup::default_config_path);
            let config: Config = setup::load_config(config.as_deref())?;
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
