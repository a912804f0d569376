//! Event loops wiring the two event sources to the pilot core.
//!
//! Each source has exactly one consumer task, so events are handled in the
//! order they were produced.

use bytes::Bytes;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::keepalive::Keepalive;
use crate::controller::events::ControllerEvent;
use crate::controller::translator::CommandTranslator;
use crate::telemetry::cache::TelemetryCache;
use crate::vehicle::link::VehicleEvent;
use crate::video::relay::VideoRelay;

/// Capacity of the controller event channel.
pub const CONTROLLER_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the vehicle event channel. Video chunks dominate.
pub const VEHICLE_CHANNEL_CAPACITY: usize = 512;

/// Frames queued for the video relay task. Frames beyond this are dropped
/// while the player is not reading.
pub const VIDEO_QUEUE_CAPACITY: usize = 256;

/// Consumes controller events until every reader is gone.
pub async fn run_controller_events(
    mut rx: mpsc::Receiver<ControllerEvent>,
    translator: CommandTranslator,
) {
    while let Some(event) = rx.recv().await {
        translator.handle(event);
    }
    info!("Controller event stream ended");
}

/// Consumes vehicle events until the link goes away.
///
/// Frames go to a separate relay task so a stalled player never delays
/// telemetry or connection events. They are dropped unread when `relay` is
/// `None`.
pub async fn run_vehicle_events<W>(
    mut rx: mpsc::Receiver<VehicleEvent>,
    keepalive: Arc<Keepalive>,
    telemetry: Arc<TelemetryCache>,
    relay: Option<VideoRelay<W>>,
) where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let video = match relay {
        Some(relay) => {
            let (tx, frames) = mpsc::channel(VIDEO_QUEUE_CAPACITY);
            Some((tx, tokio::spawn(run_video_relay(frames, relay))))
        }
        None => {
            info!("Video forwarding disabled");
            None
        }
    };
    let mut frames_dropped: u64 = 0;

    while let Some(event) = rx.recv().await {
        match event {
            VehicleEvent::Connected => keepalive.on_connected(),
            VehicleEvent::FlightStatus(status) => {
                debug!("Flight status: {:?}", status);
                telemetry.update_flight(status);
            }
            VehicleEvent::LinkQuality(quality) => {
                debug!("Link quality: {:?}", quality);
                telemetry.update_link(quality);
            }
            VehicleEvent::VideoFrame(frame) => {
                let Some((tx, _)) = &video else {
                    continue;
                };
                if tx.try_send(frame).is_err() {
                    if frames_dropped == 0 {
                        warn!("Video player is not keeping up, dropping frames");
                    }
                    frames_dropped += 1;
                }
            }
        }
    }

    if let Some((tx, handle)) = video {
        drop(tx);
        if let Err(e) = handle.await {
            warn!("Video relay task failed: {}", e);
        }
    }
    if frames_dropped > 0 {
        info!("Dropped {} video frames", frames_dropped);
    }
    info!("Vehicle event stream ended");
}

/// Writes queued frames to the player until the queue closes.
pub async fn run_video_relay<W>(mut frames: mpsc::Receiver<Bytes>, mut relay: VideoRelay<W>)
where
    W: AsyncWrite + Unpin + Send,
{
    while let Some(frame) = frames.recv().await {
        relay.forward(&frame).await;
    }
    info!("Video relay forwarded {} frames", relay.frames_forwarded());
}
