//! Trait seam between the pilot core and the drone transport.
//!
//! The core only ever talks to a [`VehicleLink`]; notifications flow the other
//! way as [`VehicleEvent`]s on an mpsc channel handed to the transport.

use async_trait::async_trait;
use bytes::Bytes;

use super::command::{FlipDirection, Magnitude, MoveDirection, RotateDirection, SpeedTier};
use crate::error::Result;
use crate::telemetry::types::{FlightStatus, LinkQuality};

/// Notification emitted by a vehicle transport.
#[derive(Debug, Clone, PartialEq)]
pub enum VehicleEvent {
    /// The drone acknowledged the handshake.
    Connected,
    FlightStatus(FlightStatus),
    LinkQuality(LinkQuality),
    /// One chunk of the raw video elementary stream.
    VideoFrame(Bytes),
}

/// Command operations offered by a drone transport.
///
/// Every call is fire-and-forget from the pilot's point of view: a returned
/// error is logged by the dispatcher and never retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehicleLink: Send + Sync {
    /// Start the handshake. Completion is signalled by [`VehicleEvent::Connected`].
    async fn connect(&self) -> Result<()>;

    async fn move_in(&self, direction: MoveDirection, magnitude: Magnitude) -> Result<()>;

    async fn rotate(&self, direction: RotateDirection, magnitude: Magnitude) -> Result<()>;

    async fn takeoff(&self) -> Result<()>;

    async fn throw_takeoff(&self) -> Result<()>;

    async fn land(&self) -> Result<()>;

    async fn flip(&self, direction: FlipDirection) -> Result<()>;

    async fn toggle_bounce(&self) -> Result<()>;

    /// Switch speed tier and report the tier now in effect.
    async fn toggle_speed(&self) -> Result<SpeedTier>;

    async fn start_video(&self) -> Result<()>;

    async fn set_video_rate(&self, level: u8) -> Result<()>;
}
