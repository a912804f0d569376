//! # Tello SDK Link
//!
//! [`VehicleLink`] over the Tello SDK text protocol.
//!
//! ## Sockets
//!
//! | Socket | Direction | Content |
//! |--------|-----------|---------|
//! | command (ephemeral) | both | commands to `192.168.10.1:8889`; `ok`/`error`/value replies |
//! | state (8890) | in | `key:value;` flight state, ~10Hz |
//! | video (11111) | in | raw H.264 elementary stream chunks |
//!
//! ## Handshake
//!
//! `connect` sends `command`. The first `ok` reply is reported as
//! [`VehicleEvent::Connected`]. Until then the poll task resends `command`
//! every poll period; afterwards it asks `wifi?` and reports the numeric
//! reply as link strength.
//!
//! ## Sticks
//!
//! Move and rotate commands update one channel of a four-channel stick state
//! (left/right, forward/back, up/down, yaw; each -100..=100) and send the
//! whole state as `rc a b c d`, leaving the other channels as they were.

use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::command::{FlipDirection, Magnitude, MoveDirection, RotateDirection, SpeedTier};
use super::link::{VehicleEvent, VehicleLink};
use crate::config::VehicleConfig;
use crate::error::{PilotError, Result};
use crate::telemetry::types::{FlightStatus, LinkQuality};

/// Enters SDK mode; the drone answers `ok`.
const HANDSHAKE: &str = "command";

/// Link quality query; the drone answers with the SNR.
const WIFI_QUERY: &str = "wifi?";

/// Speed tiers in cm/s.
const SPEED_LOW_CM_S: u8 = 50;
const SPEED_HIGH_CM_S: u8 = 100;

/// Largest datagram the drone sends (video chunks are 1460 bytes).
const MAX_DATAGRAM: usize = 2048;

/// Reply on the command socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Ok,
    Error(String),
    /// Bare number, the answer to a `?` query.
    Value(u8),
    Other(String),
}

/// Classifies a command-socket reply.
#[must_use]
pub fn parse_response(text: &str) -> Response {
    let text = text.trim();
    if text.eq_ignore_ascii_case("ok") {
        Response::Ok
    } else if text.to_ascii_lowercase().starts_with("error") {
        Response::Error(text.to_string())
    } else if let Ok(value) = text.parse::<u8>() {
        Response::Value(value)
    } else {
        Response::Other(text.to_string())
    }
}

/// Parses a state datagram (`pitch:0;roll:0;...;h:30;bat:87;...;time:12;`).
///
/// Returns `None` when no battery field is present.
#[must_use]
pub fn parse_state(text: &str) -> Option<FlightStatus> {
    let mut battery = None;
    let mut status = FlightStatus::default();

    for field in text.trim().split(';') {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "bat" => battery = value.parse::<i32>().ok().map(|b| b.clamp(0, 100) as u8),
            "h" => status.height_cm = value.parse().unwrap_or(status.height_cm),
            "time" => status.flight_time_s = value.parse().unwrap_or(status.flight_time_s),
            _ => {}
        }
    }

    battery.map(|battery_percentage| FlightStatus {
        battery_percentage,
        ..status
    })
}

/// Virtual stick positions sent with `rc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickState {
    pub left_right: i8,
    pub forward_back: i8,
    pub up_down: i8,
    pub yaw: i8,
}

impl StickState {
    fn scaled(magnitude: Magnitude, positive: bool) -> i8 {
        // percent() is at most 100
        let value = magnitude.percent() as i8;
        if positive { value } else { -value }
    }

    /// Sets the channel for `direction`; the other channels keep their value.
    pub fn apply_move(&mut self, direction: MoveDirection, magnitude: Magnitude) {
        match direction {
            MoveDirection::Forward => self.forward_back = Self::scaled(magnitude, true),
            MoveDirection::Backward => self.forward_back = Self::scaled(magnitude, false),
            MoveDirection::Right => self.left_right = Self::scaled(magnitude, true),
            MoveDirection::Left => self.left_right = Self::scaled(magnitude, false),
            MoveDirection::Up => self.up_down = Self::scaled(magnitude, true),
            MoveDirection::Down => self.up_down = Self::scaled(magnitude, false),
        }
    }

    pub fn apply_rotate(&mut self, direction: RotateDirection, magnitude: Magnitude) {
        self.yaw = Self::scaled(magnitude, direction == RotateDirection::Clockwise);
    }

    /// The `rc` command for the current state.
    #[must_use]
    pub fn to_command(&self) -> String {
        format!(
            "rc {} {} {} {}",
            self.left_right, self.forward_back, self.up_down, self.yaw
        )
    }
}

fn flip_command(direction: FlipDirection) -> &'static str {
    match direction {
        FlipDirection::Forward => "flip f",
        FlipDirection::Backward => "flip b",
        FlipDirection::Left => "flip l",
        FlipDirection::Right => "flip r",
    }
}

fn speed_cm_s(tier: SpeedTier) -> u8 {
    match tier {
        SpeedTier::Low => SPEED_LOW_CM_S,
        SpeedTier::High => SPEED_HIGH_CM_S,
    }
}

/// Tello SDK transport.
pub struct SdkLink {
    command: Arc<UdpSocket>,
    state_addr: SocketAddr,
    video_addr: SocketAddr,
    sticks: Mutex<StickState>,
    speed: Mutex<SpeedTier>,
    tasks: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for SdkLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkLink")
            .field("state_addr", &self.state_addr)
            .field("video_addr", &self.video_addr)
            .finish_non_exhaustive()
    }
}

impl SdkLink {
    /// Binds all sockets per `config` and starts the receive tasks.
    ///
    /// # Errors
    ///
    /// Returns error if the address is invalid or a socket cannot be bound.
    pub async fn bind(config: &VehicleConfig, events: mpsc::Sender<VehicleEvent>) -> Result<Self> {
        Self::bind_with(
            config.socket_addr()?,
            SocketAddr::from(([0, 0, 0, 0], config.state_port)),
            SocketAddr::from(([0, 0, 0, 0], config.video_port)),
            Duration::from_millis(config.poll_interval_ms),
            events,
        )
        .await
    }

    /// Like [`SdkLink::bind`] with explicit addresses.
    pub async fn bind_with(
        drone: SocketAddr,
        state_bind: SocketAddr,
        video_bind: SocketAddr,
        poll_interval: Duration,
        events: mpsc::Sender<VehicleEvent>,
    ) -> Result<Self> {
        let local = if drone.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let command = UdpSocket::bind(local).await?;
        command
            .connect(drone)
            .await
            .map_err(|e| PilotError::Link(format!("Failed to address {}: {}", drone, e)))?;
        let command = Arc::new(command);

        let state = UdpSocket::bind(state_bind)
            .await
            .map_err(|e| {
                PilotError::Link(format!("Failed to bind state port {}: {}", state_bind, e))
            })?;
        let video = UdpSocket::bind(video_bind)
            .await
            .map_err(|e| {
                PilotError::Link(format!("Failed to bind video port {}: {}", video_bind, e))
            })?;
        let state_addr = state.local_addr()?;
        let video_addr = video.local_addr()?;

        info!(
            "Tello link ready: drone {}, state on {}, video on {}",
            drone, state_addr, video_addr
        );

        let connected = Arc::new(AtomicBool::new(false));
        let tasks = vec![
            tokio::spawn(response_loop(command.clone(), connected.clone(), events.clone())),
            tokio::spawn(poll_loop(command.clone(), connected, poll_interval)),
            tokio::spawn(state_loop(state, events.clone())),
            tokio::spawn(video_loop(video, events)),
        ];

        Ok(Self {
            command,
            state_addr,
            video_addr,
            sticks: Mutex::new(StickState::default()),
            speed: Mutex::new(SpeedTier::default()),
            tasks,
        })
    }

    /// Local address receiving state datagrams.
    pub fn state_addr(&self) -> SocketAddr {
        self.state_addr
    }

    /// Local address receiving video datagrams.
    pub fn video_addr(&self) -> SocketAddr {
        self.video_addr
    }

    async fn send(&self, text: &str) -> Result<()> {
        send_text(&self.command, text).await
    }
}

impl Drop for SdkLink {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn send_text(socket: &UdpSocket, text: &str) -> Result<()> {
    trace!("-> {}", text);
    socket
        .send(text.as_bytes())
        .await
        .map_err(|e| PilotError::Link(format!("Failed to send '{}': {}", text, e)))?;
    Ok(())
}

#[async_trait]
impl VehicleLink for SdkLink {
    async fn connect(&self) -> Result<()> {
        info!("Connecting to Tello...");
        self.send(HANDSHAKE).await
    }

    async fn move_in(&self, direction: MoveDirection, magnitude: Magnitude) -> Result<()> {
        let command = {
            let mut sticks = self.sticks.lock().unwrap_or_else(PoisonError::into_inner);
            sticks.apply_move(direction, magnitude);
            sticks.to_command()
        };
        self.send(&command).await
    }

    async fn rotate(&self, direction: RotateDirection, magnitude: Magnitude) -> Result<()> {
        let command = {
            let mut sticks = self.sticks.lock().unwrap_or_else(PoisonError::into_inner);
            sticks.apply_rotate(direction, magnitude);
            sticks.to_command()
        };
        self.send(&command).await
    }

    async fn takeoff(&self) -> Result<()> {
        self.send("takeoff").await
    }

    async fn throw_takeoff(&self) -> Result<()> {
        Err(PilotError::Unsupported("throw takeoff"))
    }

    async fn land(&self) -> Result<()> {
        self.send("land").await
    }

    async fn flip(&self, direction: FlipDirection) -> Result<()> {
        self.send(flip_command(direction)).await
    }

    async fn toggle_bounce(&self) -> Result<()> {
        Err(PilotError::Unsupported("bounce"))
    }

    async fn toggle_speed(&self) -> Result<SpeedTier> {
        let next = self.speed.lock().unwrap_or_else(PoisonError::into_inner).toggled();
        self.send(&format!("speed {}", speed_cm_s(next))).await?;
        *self.speed.lock().unwrap_or_else(PoisonError::into_inner) = next;
        Ok(next)
    }

    async fn start_video(&self) -> Result<()> {
        self.send("streamon").await
    }

    async fn set_video_rate(&self, level: u8) -> Result<()> {
        self.send(&format!("setbitrate {}", level)).await
    }
}

async fn response_loop(
    socket: Arc<UdpSocket>,
    connected: Arc<AtomicBool>,
    events: mpsc::Sender<VehicleEvent>,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let n = match socket.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                // ICMP port unreachable surfaces here while the drone is away
                debug!("Command socket receive failed: {}", e);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&buf[..n]);
        trace!("<- {}", text.trim());

        let event = match parse_response(&text) {
            Response::Ok if !connected.swap(true, Ordering::SeqCst) => {
                Some(VehicleEvent::Connected)
            }
            Response::Ok => None,
            Response::Value(snr) if connected.load(Ordering::SeqCst) => {
                Some(VehicleEvent::LinkQuality(LinkQuality {
                    strength: snr,
                    disturbance: 0,
                }))
            }
            Response::Error(reply) => {
                warn!("Drone rejected command: {}", reply);
                None
            }
            other => {
                debug!("Unhandled reply: {:?}", other);
                None
            }
        };

        if let Some(event) = event {
            if events.send(event).await.is_err() {
                return;
            }
        }
    }
}

async fn poll_loop(socket: Arc<UdpSocket>, connected: Arc<AtomicBool>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let query = if connected.load(Ordering::SeqCst) {
            WIFI_QUERY
        } else {
            debug!("No handshake reply yet, retrying");
            HANDSHAKE
        };
        if let Err(e) = send_text(&socket, query).await {
            debug!("Poll failed: {}", e);
        }
    }
}

async fn state_loop(socket: UdpSocket, events: mpsc::Sender<VehicleEvent>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let n = match socket.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                debug!("State socket receive failed: {}", e);
                continue;
            }
        };
        match parse_state(&String::from_utf8_lossy(&buf[..n])) {
            Some(status) => {
                if events.send(VehicleEvent::FlightStatus(status)).await.is_err() {
                    return;
                }
            }
            None => debug!("Ignoring malformed state datagram ({} bytes)", n),
        }
    }
}

async fn video_loop(socket: UdpSocket, events: mpsc::Sender<VehicleEvent>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let n = match socket.recv(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                debug!("Video socket receive failed: {}", e);
                continue;
            }
        };
        let frame = Bytes::copy_from_slice(&buf[..n]);
        if events.send(VehicleEvent::VideoFrame(frame)).await.is_err() {
            return;
        }
    }
}
