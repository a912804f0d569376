//! # Error Types
//!
//! Custom error types for Tello Pilot using `thiserror`.

use thiserror::Error;

/// Main error type for Tello Pilot
#[derive(Debug, Error)]
pub enum PilotError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller access errors (permissions, disconnects)
    #[error("Controller error: {0}")]
    Controller(String),

    /// No supported controller was found on the system
    #[error("No DualShock 4 controller found")]
    ControllerNotFound,

    /// Vehicle link errors (socket failures, rejected commands)
    #[error("Vehicle link error: {0}")]
    Link(String),

    /// The vehicle transport has no way to express this operation
    #[error("Operation not supported by the vehicle link: {0}")]
    Unsupported(&'static str),

    /// Video sink process errors
    #[error("Video sink error: {0}")]
    VideoSink(String),
}

/// Result type alias for Tello Pilot
pub type Result<T> = std::result::Result<T, PilotError>;
