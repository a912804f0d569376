//! # Controller Module
//!
//! DualShock 4 controller input handling.
//!
//! This module handles:
//! - DualShock 4 detection and connection via evdev
//! - Decoding raw stick and button events
//! - Scaling axis values and the optional deadzone
//! - Translating events into vehicle commands

pub mod calibration;
pub mod ds4;
pub mod events;
pub mod translator;
