//! Shared pilot context.
//!
//! One `PilotContext` is built at startup and cloned into every task that
//! needs shared state. Cloning is cheap; all clones see the same cache,
//! connection state and dispatcher.

use std::sync::Arc;
use tokio::sync::watch;

use crate::connection::ConnectionState;
use crate::telemetry::cache::TelemetryCache;
use crate::vehicle::dispatcher::CommandDispatcher;

/// Handles to the state shared by the controller and vehicle event loops.
#[derive(Debug, Clone)]
pub struct PilotContext {
    pub telemetry: Arc<TelemetryCache>,
    pub connection: watch::Receiver<ConnectionState>,
    pub commands: CommandDispatcher,
}

impl PilotContext {
    #[must_use]
    pub fn new(
        telemetry: Arc<TelemetryCache>,
        connection: watch::Receiver<ConnectionState>,
        commands: CommandDispatcher,
    ) -> Self {
        Self {
            telemetry,
            connection,
            commands,
        }
    }

    /// Operator status line: telemetry plus connection state.
    #[must_use]
    pub fn status_line(&self) -> String {
        let state = *self.connection.borrow();
        format!("{} | Link: {}", self.telemetry.snapshot().status_line(), state)
    }
}
