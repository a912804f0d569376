//! # Telemetry Module
//!
//! Last-known drone telemetry.
//!
//! This module handles:
//! - Flight status and link quality record types
//! - A two-slot cache written by the vehicle event loop and read by the
//!   controller's status query

pub mod cache;
pub mod types;
