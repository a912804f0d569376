//! # Tello Pilot
//!
//! Fly a Tello drone with a DualShock 4 controller and a live video feed.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, default `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Bind the drone sockets and start the command dispatcher
//!    - Launch the video player (optional, failures tolerated)
//!    - Open the controller
//!
//! 2. **Running**
//!    - Controller events become vehicle commands
//!    - Drone events update telemetry, arm the video keepalive and feed video
//!
//! 3. **Shutdown** on Ctrl+C: stop the keepalive, exit.
//!
//! Expected output:
//! ```text
//! INFO tello_pilot: Tello Pilot v0.1.0 starting...
//! INFO tello_pilot::vehicle::sdk: Tello link ready: drone 192.168.10.1:8889,
//!      state on 0.0.0.0:8890, video on 0.0.0.0:11111
//! INFO tello_pilot::video::relay: Started video player: mplayer -fps 60 -xy 500 -
//! INFO tello_pilot::controller::ds4: Found DualShock 4 gamepad at: /dev/input/event5
//! Connected
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use tello_pilot::config::{Config, LoggingConfig};
use tello_pilot::connection::keepalive::Keepalive;
use tello_pilot::context::PilotContext;
use tello_pilot::controller::calibration::Calibration;
use tello_pilot::controller::ds4::DualShock4;
use tello_pilot::controller::translator::CommandTranslator;
use tello_pilot::orchestrator::{
    run_controller_events, run_vehicle_events, CONTROLLER_CHANNEL_CAPACITY,
    VEHICLE_CHANNEL_CAPACITY,
};
use tello_pilot::telemetry::cache::TelemetryCache;
use tello_pilot::vehicle::dispatcher::{run_dispatcher, CommandDispatcher};
use tello_pilot::vehicle::link::VehicleLink;
use tello_pilot::vehicle::sdk::SdkLink;
use tello_pilot::video::relay::VideoRelay;

/// Used when no path is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix of the rolling log.
const LOG_FILE_PREFIX: &str = "tello-pilot.log";

/// Console logging plus an optional daily log file. `RUST_LOG` overrides the
/// configured level. The returned guard must live until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = if config.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path))?;

    let _log_guard = init_logging(&config.logging);

    info!("Tello Pilot v{} starting...", env!("CARGO_PKG_VERSION"));
    if Path::new(&config_path).exists() {
        info!("Configuration: {}", config_path);
    } else {
        warn!("Config file {} not found, using defaults", config_path);
    }

    // Drone link and the single task allowed to call it
    let (vehicle_tx, vehicle_rx) = mpsc::channel(VEHICLE_CHANNEL_CAPACITY);
    let link: Arc<dyn VehicleLink> = Arc::new(
        SdkLink::bind(&config.vehicle, vehicle_tx)
            .await
            .context("Failed to open drone link")?,
    );
    let (commands, command_rx) = CommandDispatcher::channel();
    tokio::spawn(run_dispatcher(link.clone(), command_rx));

    let keepalive = Arc::new(Keepalive::new(commands.clone(), &config.keepalive));
    let telemetry = Arc::new(TelemetryCache::new());
    let context = PilotContext::new(telemetry.clone(), keepalive.subscribe(), commands);

    let relay = if config.video.enabled {
        match VideoRelay::launch(&config.video) {
            Ok(relay) => Some(relay),
            Err(e) => {
                error!("{}; continuing without video", e);
                None
            }
        }
    } else {
        None
    };

    let controller = if config.controller.device_path.is_empty() {
        DualShock4::open()
    } else {
        DualShock4::open_path(&config.controller.device_path)
    }
    .context("Failed to open controller")?;
    info!("Controller ready: {}", controller.device_path());

    let (controller_tx, controller_rx) = mpsc::channel(CONTROLLER_CHANNEL_CAPACITY);
    let _readers = controller.spawn_readers(controller_tx);

    let translator = CommandTranslator::new(Calibration::new(config.controller.deadzone), context);
    tokio::spawn(run_controller_events(controller_rx, translator));
    tokio::spawn(run_vehicle_events(
        vehicle_rx,
        keepalive.clone(),
        telemetry,
        relay,
    ));

    link.connect().await.context("Failed to start handshake")?;

    info!("Press Ctrl+C to exit");

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
    }
    info!("Received Ctrl+C, shutting down...");
    keepalive.shutdown();

    Ok(())
}
