//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; anything left out falls back
//! to the defaults below, which reproduce the stock Tello + DualShock 4 setup.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use tracing::warn;

use crate::error::{PilotError, Result};

/// Log levels accepted by `logging.level`.
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub vehicle: VehicleConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Vehicle link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleConfig {
    /// Command endpoint of the drone (`ip:port`).
    #[serde(default = "default_vehicle_address")]
    pub address: String,

    /// Local UDP port the drone pushes state datagrams to.
    #[serde(default = "default_state_port")]
    pub state_port: u16,

    /// Local UDP port the drone pushes video datagrams to.
    #[serde(default = "default_video_port")]
    pub video_port: u16,

    /// Interval between handshake retries and link-quality queries.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Controller configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// Explicit evdev node; empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    /// Magnitudes below this fraction are sent as zero. 0.0 disables it.
    #[serde(default)]
    pub deadzone: f32,
}

/// Video keepalive configuration
#[derive(Debug, Deserialize, Clone)]
pub struct KeepaliveConfig {
    #[serde(default = "default_keepalive_period_ms")]
    pub period_ms: u64,

    #[serde(default = "default_video_encoder_rate")]
    pub video_encoder_rate: u8,
}

/// Video sink configuration
#[derive(Debug, Deserialize, Clone)]
pub struct VideoConfig {
    #[serde(default = "default_video_enabled")]
    pub enabled: bool,

    #[serde(default = "default_player")]
    pub player: String,

    #[serde(default = "default_player_args")]
    pub player_args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rolling log files; empty disables file logging.
    #[serde(default)]
    pub log_dir: String,
}

// Default value functions
fn default_vehicle_address() -> String { "192.168.10.1:8889".to_string() }
fn default_state_port() -> u16 { 8890 }
fn default_video_port() -> u16 { 11111 }
fn default_poll_interval_ms() -> u64 { 1000 }

fn default_keepalive_period_ms() -> u64 { 100 }
fn default_video_encoder_rate() -> u8 { 4 }

fn default_video_enabled() -> bool { true }
fn default_player() -> String { "mplayer".to_string() }
fn default_player_args() -> Vec<String> {
    ["-fps", "60", "-xy", "500", "-"].iter().map(|s| s.to_string()).collect()
}

fn default_log_level() -> String { "info".to_string() }

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            address: default_vehicle_address(),
            state_port: default_state_port(),
            video_port: default_video_port(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            deadzone: 0.0,
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            period_ms: default_keepalive_period_ms(),
            video_encoder_rate: default_video_encoder_rate(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: default_video_enabled(),
            player: default_player(),
            player_args: default_player_args(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
        }
    }
}

impl VehicleConfig {
    /// Parsed command endpoint. Only valid after [`Config::validate`] passed.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.address.parse().map_err(|_| {
            PilotError::Config(toml::de::Error::custom(format!(
                "vehicle address '{}' is not a valid socket address",
                self.address
            )))
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tello_pilot::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or fall back to built-in defaults when
    /// the file does not exist. A file that exists but is invalid is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            warn!("Config file {} not found, using defaults", path.display());
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        self.vehicle.socket_addr()?;

        if self.vehicle.state_port == 0 || self.vehicle.video_port == 0 {
            return Err(PilotError::Config(
                toml::de::Error::custom("state_port and video_port must be non-zero")
            ));
        }

        if self.vehicle.state_port == self.vehicle.video_port {
            return Err(PilotError::Config(
                toml::de::Error::custom("state_port and video_port must differ")
            ));
        }

        if self.vehicle.poll_interval_ms == 0 || self.vehicle.poll_interval_ms > 60000 {
            return Err(PilotError::Config(
                toml::de::Error::custom("poll_interval_ms must be between 1 and 60000")
            ));
        }

        if !(0.0..=0.25).contains(&self.controller.deadzone) {
            return Err(PilotError::Config(
                toml::de::Error::custom("deadzone must be between 0.0 and 0.25")
            ));
        }

        if self.keepalive.period_ms == 0 || self.keepalive.period_ms > 10000 {
            return Err(PilotError::Config(
                toml::de::Error::custom("keepalive period_ms must be between 1 and 10000")
            ));
        }

        // Tello encoder levels: 0 = auto, 1-5 = Mbps
        if self.keepalive.video_encoder_rate > 5 {
            return Err(PilotError::Config(
                toml::de::Error::custom("video_encoder_rate must be between 0 and 5")
            ));
        }

        if self.video.enabled && self.video.player.trim().is_empty() {
            return Err(PilotError::Config(
                toml::de::Error::custom("video player cannot be empty when video is enabled")
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(PilotError::Config(
                toml::de::Error::custom(format!(
                    "logging level must be one of: {}",
                    LOG_LEVELS.join(", ")
                ))
            ));
        }

        Ok(())
    }
}
