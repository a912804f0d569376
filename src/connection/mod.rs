//! # Connection Module
//!
//! Connection lifecycle of the drone link.
//!
//! This module handles:
//! - The process-wide [`ConnectionState`]
//! - The video keepalive state machine that re-requests the stream

pub mod keepalive;

use std::fmt;

/// Where the drone link currently stands. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
    /// Video has been requested and the keepalive timer is running.
    VideoActive,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::VideoActive => write!(f, "video active"),
        }
    }
}
