//! # Command Dispatcher
//!
//! Serializes every vehicle command through a single task.
//!
//! The controller translator and the keepalive timer both hold a cloned
//! [`CommandDispatcher`]; the one task draining the channel is the only caller
//! of the [`VehicleLink`], so commands never overlap on the transport.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::command::{SpeedTier, VehicleCommand};
use super::link::VehicleLink;
use crate::error::Result;

/// Receiving half consumed by [`run_dispatcher`].
pub type CommandReceiver = mpsc::UnboundedReceiver<VehicleCommand>;

/// Cloneable handle for submitting commands.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    tx: mpsc::UnboundedSender<VehicleCommand>,
}

impl CommandDispatcher {
    /// Creates a dispatcher handle and the receiver its task must drain.
    #[must_use]
    pub fn channel() -> (Self, CommandReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a command for immediate delivery. Never blocks, never fails:
    /// once the dispatcher task is gone, commands are dropped.
    pub fn send(&self, command: VehicleCommand) {
        if self.tx.send(command).is_err() {
            debug!("Dispatcher stopped, dropping {:?}", command);
        }
    }
}

/// Drains `rx` and forwards each command to `link` until every
/// [`CommandDispatcher`] handle is dropped.
pub async fn run_dispatcher(link: Arc<dyn VehicleLink>, mut rx: CommandReceiver) {
    while let Some(command) = rx.recv().await {
        if let Err(e) = execute(link.as_ref(), command).await {
            warn!("Command {:?} failed: {}", command, e);
        }
    }
    debug!("Command dispatcher finished");
}

/// Performs one command against the link.
pub async fn execute(link: &dyn VehicleLink, command: VehicleCommand) -> Result<()> {
    match command {
        VehicleCommand::Move { direction, magnitude } => link.move_in(direction, magnitude).await,
        VehicleCommand::Rotate { direction, magnitude } => link.rotate(direction, magnitude).await,
        VehicleCommand::Takeoff => {
            info!("Takeoff");
            link.takeoff().await
        }
        VehicleCommand::ThrowTakeoff => {
            info!("Throw takeoff");
            link.throw_takeoff().await
        }
        VehicleCommand::Land => {
            info!("Land");
            link.land().await
        }
        VehicleCommand::Flip(direction) => link.flip(direction).await,
        VehicleCommand::ToggleBounce => link.toggle_bounce().await,
        VehicleCommand::ToggleSpeed => {
            let tier = link.toggle_speed().await?;
            report_speed(tier);
            Ok(())
        }
        VehicleCommand::StartVideo => link.start_video().await,
        VehicleCommand::SetVideoRate(level) => link.set_video_rate(level).await,
    }
}

fn report_speed(tier: SpeedTier) {
    info!("Speed tier now {}", tier);
    println!("Set drone to {} speed", tier);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PilotError;
    use crate::vehicle::command::{FlipDirection, Magnitude, MoveDirection, RotateDirection};
    use crate::vehicle::link::MockVehicleLink;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_execute_move() {
        let mut link = MockVehicleLink::new();
        link.expect_move_in()
            .with(eq(MoveDirection::Forward), eq(Magnitude::new(0.5)))
            .times(1)
            .returning(|_, _| Ok(()));

        let command = VehicleCommand::Move {
            direction: MoveDirection::Forward,
            magnitude: Magnitude::new(0.5),
        };
        assert!(execute(&link, command).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_rotate() {
        let mut link = MockVehicleLink::new();
        link.expect_rotate()
            .with(eq(RotateDirection::CounterClockwise), eq(Magnitude::FULL))
            .times(1)
            .returning(|_, _| Ok(()));

        let command = VehicleCommand::Rotate {
            direction: RotateDirection::CounterClockwise,
            magnitude: Magnitude::FULL,
        };
        assert!(execute(&link, command).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_discrete_maneuvers() {
        let mut link = MockVehicleLink::new();
        link.expect_takeoff().times(1).returning(|| Ok(()));
        link.expect_throw_takeoff().times(1).returning(|| Ok(()));
        link.expect_land().times(1).returning(|| Ok(()));
        link.expect_flip()
            .with(eq(FlipDirection::Left))
            .times(1)
            .returning(|_| Ok(()));
        link.expect_toggle_bounce().times(1).returning(|| Ok(()));
        link.expect_toggle_speed().times(1).returning(|| Ok(SpeedTier::High));

        for command in [
            VehicleCommand::Takeoff,
            VehicleCommand::ThrowTakeoff,
            VehicleCommand::Land,
            VehicleCommand::Flip(FlipDirection::Left),
            VehicleCommand::ToggleBounce,
            VehicleCommand::ToggleSpeed,
        ] {
            assert!(execute(&link, command).await.is_ok(), "{:?} should succeed", command);
        }
    }

    #[tokio::test]
    async fn test_execute_video_commands() {
        let mut link = MockVehicleLink::new();
        link.expect_start_video().times(1).returning(|| Ok(()));
        link.expect_set_video_rate()
            .with(eq(4u8))
            .times(1)
            .returning(|_| Ok(()));

        assert!(execute(&link, VehicleCommand::StartVideo).await.is_ok());
        assert!(execute(&link, VehicleCommand::SetVideoRate(4)).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatcher_survives_failures() {
        let mut link = MockVehicleLink::new();
        link.expect_throw_takeoff()
            .times(1)
            .returning(|| Err(PilotError::Unsupported("throw takeoff")));
        link.expect_land().times(1).returning(|| Ok(()));

        let (dispatcher, rx) = CommandDispatcher::channel();
        dispatcher.send(VehicleCommand::ThrowTakeoff);
        dispatcher.send(VehicleCommand::Land);
        drop(dispatcher);

        // Returns once the channel is closed and drained; the mock verifies
        // that Land still went through after the failed command.
        run_dispatcher(Arc::new(link), rx).await;
    }

    #[tokio::test]
    async fn test_dispatcher_preserves_order() {
        let mut seq = mockall::Sequence::new();
        let mut link = MockVehicleLink::new();
        link.expect_takeoff().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        link.expect_start_video().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        link.expect_land().times(1).in_sequence(&mut seq).returning(|| Ok(()));

        let (dispatcher, rx) = CommandDispatcher::channel();
        dispatcher.send(VehicleCommand::Takeoff);
        dispatcher.send(VehicleCommand::StartVideo);
        dispatcher.send(VehicleCommand::Land);
        drop(dispatcher);

        run_dispatcher(Arc::new(link), rx).await;
    }

    #[test]
    fn test_send_after_dispatcher_stopped() {
        let (dispatcher, rx) = CommandDispatcher::channel();
        drop(rx);
        // Must not panic
        dispatcher.send(VehicleCommand::Takeoff);
    }
}
