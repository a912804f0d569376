//! # Video Module
//!
//! Relays the drone's raw video stream into an external player.

pub mod relay;
