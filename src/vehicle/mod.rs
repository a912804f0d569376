//! # Vehicle Module
//!
//! Everything between the pilot core and the drone.
//!
//! This module handles:
//! - The vehicle command model
//! - The [`link::VehicleLink`] transport seam and its notifications
//! - Serialized command dispatch
//! - The Tello SDK UDP transport

pub mod command;
pub mod dispatcher;
pub mod link;
pub mod sdk;
