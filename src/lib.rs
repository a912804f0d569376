//! # Tello Pilot Library
//!
//! Fly a Tello drone with a DualShock 4 controller and a live video feed.
//!
//! Controller events are translated into vehicle commands and serialized
//! through a single dispatcher onto the drone link. Notifications from the
//! drone fill a telemetry cache, drive the video keepalive and feed raw video
//! into an external player.

pub mod config;
pub mod connection;
pub mod context;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod telemetry;
pub mod vehicle;
pub mod video;
