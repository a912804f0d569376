//! # Video Keepalive
//!
//! Drives `Disconnected -> Connected -> VideoActive` and keeps the video
//! stream alive afterwards.
//!
//! The Tello stops sending video unless the stream is requested again every
//! so often. Once connected, the keepalive re-issues `StartVideo` on a fixed
//! period for the rest of the process lifetime, whether or not frames are
//! arriving. The drone treats a repeated request as a no-op.
//!
//! All commands go through the shared [`CommandDispatcher`], so a timer tick
//! never races a controller command on the link.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::ConnectionState;
use crate::config::KeepaliveConfig;
use crate::vehicle::command::VehicleCommand;
use crate::vehicle::dispatcher::CommandDispatcher;

/// Owner of the process-wide [`ConnectionState`].
#[derive(Debug)]
pub struct Keepalive {
    state: watch::Sender<ConnectionState>,
    commands: CommandDispatcher,
    period: Duration,
    encoder_rate: u8,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Keepalive {
    #[must_use]
    pub fn new(commands: CommandDispatcher, config: &KeepaliveConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state,
            commands,
            period: Duration::from_millis(config.period_ms),
            encoder_rate: config.video_encoder_rate,
            timer: Mutex::new(None),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Read-only view of the connection state for other tasks.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Handles the link-established notification.
    ///
    /// The first call requests video, sets the encoder rate and arms the
    /// keepalive timer. Later calls are ignored. Must run inside a Tokio
    /// runtime.
    pub fn on_connected(&self) {
        let entered = self.state.send_if_modified(|state| {
            if *state == ConnectionState::Disconnected {
                *state = ConnectionState::Connected;
                true
            } else {
                false
            }
        });
        if !entered {
            debug!("Already connected, ignoring repeated notification");
            return;
        }

        info!("Connected");
        println!("Connected");

        self.commands.send(VehicleCommand::StartVideo);
        self.commands.send(VehicleCommand::SetVideoRate(self.encoder_rate));
        self.state.send_replace(ConnectionState::VideoActive);

        let handle = spawn_timer(self.commands.clone(), self.period);
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.replace(handle) {
            previous.abort();
        }
        info!("Video keepalive armed every {:?}", self.period);
    }

    /// Stops the keepalive timer. The connection state is left unchanged.
    pub fn shutdown(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = timer.take() {
            handle.abort();
            debug!("Video keepalive stopped");
        }
    }
}

impl Drop for Keepalive {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_timer(commands: CommandDispatcher, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            commands.send(VehicleCommand::StartVideo);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::dispatcher::CommandReceiver;

    fn keepalive() -> (Keepalive, CommandReceiver) {
        let (commands, rx) = CommandDispatcher::channel();
        let config = KeepaliveConfig { period_ms: 100, video_encoder_rate: 4 };
        (Keepalive::new(commands, &config), rx)
    }

    fn drain(rx: &mut CommandReceiver) -> Vec<VehicleCommand> {
        let mut out = Vec::new();
        while let Ok(command) = rx.try_recv() {
            out.push(command);
        }
        out
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (keepalive, mut rx) = keepalive();
        assert_eq!(keepalive.state(), ConnectionState::Disconnected);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_requests_video_once() {
        let (keepalive, mut rx) = keepalive();
        keepalive.on_connected();

        assert_eq!(keepalive.state(), ConnectionState::VideoActive);
        assert_eq!(
            drain(&mut rx),
            vec![VehicleCommand::StartVideo, VehicleCommand::SetVideoRate(4)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_connect_is_ignored() {
        let (keepalive, mut rx) = keepalive();
        keepalive.on_connected();
        drain(&mut rx);

        keepalive.on_connected();
        assert_eq!(keepalive.state(), ConnectionState::VideoActive);
        assert!(drain(&mut rx).is_empty(), "No commands on a repeated notification");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_at_fixed_period() {
        let (keepalive, mut rx) = keepalive();
        keepalive.on_connected();
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(1050)).await;

        let fired = drain(&mut rx);
        assert_eq!(fired.len(), 10, "Expected one StartVideo per 100ms");
        assert!(fired.iter().all(|c| *c == VehicleCommand::StartVideo));
        assert_eq!(keepalive.state(), ConnectionState::VideoActive);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_keeps_firing() {
        let (keepalive, mut rx) = keepalive();
        keepalive.on_connected();
        drain(&mut rx);

        for _ in 0..5 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            assert!(drain(&mut rx).len() >= 99);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timer_before_connect() {
        let (_keepalive, mut rx) = keepalive();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timer() {
        let (keepalive, mut rx) = keepalive();
        keepalive.on_connected();
        tokio::time::sleep(Duration::from_millis(250)).await;
        keepalive.shutdown();
        drain(&mut rx);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(drain(&mut rx).is_empty());
        assert_eq!(keepalive.state(), ConnectionState::VideoActive);
    }

    #[tokio::test]
    async fn test_subscribe_sees_transitions() {
        let (keepalive, _rx) = keepalive();
        let watcher = keepalive.subscribe();
        assert_eq!(*watcher.borrow(), ConnectionState::Disconnected);

        keepalive.on_connected();
        assert_eq!(*watcher.borrow(), ConnectionState::VideoActive);
    }
}
