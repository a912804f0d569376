//! # Video Relay
//!
//! Forwards raw video frames from the drone to a player process's stdin.
//!
//! The relay keeps no buffer: each frame is written in full and dropped. A
//! slow player back-pressures the write, nothing is ever discarded here. A
//! failed write is logged and the next frame is tried as usual, so a player
//! that exits only costs the video, never the control loop.

use std::process::Stdio;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use crate::config::VideoConfig;
use crate::error::{PilotError, Result};

/// Writes frames to one sink.
#[derive(Debug)]
pub struct VideoRelay<W> {
    sink: W,
    /// Player process, killed when the relay is dropped.
    process: Option<Child>,
    frames_forwarded: u64,
    consecutive_failures: u64,
}

impl VideoRelay<ChildStdin> {
    /// Starts the configured player and connects its stdin.
    ///
    /// # Errors
    ///
    /// Returns `VideoSink` if the process cannot be spawned.
    pub fn launch(config: &VideoConfig) -> Result<Self> {
        let mut child = Command::new(&config.player)
            .args(&config.player_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PilotError::VideoSink(format!("Failed to start {}: {}", config.player, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PilotError::VideoSink(format!("{} has no stdin", config.player)))?;

        info!("Started video player: {} {}", config.player, config.player_args.join(" "));

        Ok(Self {
            sink: stdin,
            process: Some(child),
            frames_forwarded: 0,
            consecutive_failures: 0,
        })
    }
}

impl<W: AsyncWrite + Unpin + Send> VideoRelay<W> {
    /// Wraps an already open sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            process: None,
            frames_forwarded: 0,
            consecutive_failures: 0,
        }
    }

    /// Writes one frame to the sink.
    ///
    /// Returns `true` if the whole frame was written. Failures are logged and
    /// never propagated.
    pub async fn forward(&mut self, frame: &[u8]) -> bool {
        match self.sink.write_all(frame).await {
            Ok(()) => {
                if self.consecutive_failures > 0 {
                    info!("Video sink recovered after {} failed frames", self.consecutive_failures);
                    self.consecutive_failures = 0;
                }
                self.frames_forwarded += 1;
                true
            }
            Err(e) => {
                if self.consecutive_failures == 0 {
                    warn!("Failed to write video frame ({} bytes): {}", frame.len(), e);
                } else {
                    debug!("Failed to write video frame ({} bytes): {}", frame.len(), e);
                }
                self.consecutive_failures += 1;
                false
            }
        }
    }

    /// Number of frames written successfully.
    #[must_use]
    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded
    }

    /// Whether this relay owns a player process.
    #[must_use]
    pub fn has_process(&self) -> bool {
        self.process.is_some()
    }
}
