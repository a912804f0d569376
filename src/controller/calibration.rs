//! # Calibration Module
//!
//! Converts a signed raw axis value into a non-negative command magnitude.
//!
//! ## Scaling
//!
//! `magnitude = clamp(|raw| / 32768, 0.0, 1.0)`
//!
//! The sign of `raw` is not part of the magnitude; the translator picks the
//! command direction from it separately.
//!
//! ## Deadzone
//!
//! Off by default. When configured, magnitudes at or below the threshold are
//! reported as zero; anything above passes through unscaled.
//!
//! ## Usage
//!
//! ```
//! use tello_pilot::controller::calibration::Calibration;
//!
//! let cal = Calibration::linear();
//! assert_eq!(cal.apply(-16384).get(), 0.5);
//!
//! let cal = Calibration::new(0.1);
//! assert_eq!(cal.apply(1000).get(), 0.0);
//! ```

use super::events::AXIS_MAX_VALUE;
use crate::vehicle::command::Magnitude;

/// Applies scaling and the optional deadzone to raw axis values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calibration {
    /// Deadzone as a fraction (0.0 to 0.25).
    deadzone: f32,
}

impl Calibration {
    /// Creates a calibration with the given deadzone, clamped to 0.0-0.25.
    #[must_use]
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.25),
        }
    }

    /// Creates a linear calibration (no deadzone).
    #[must_use]
    pub fn linear() -> Self {
        Self { deadzone: 0.0 }
    }

    /// Returns the configured deadzone value.
    #[must_use]
    pub fn deadzone(&self) -> f32 {
        self.deadzone
    }

    /// Converts a raw axis value to a magnitude.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_pilot::controller::calibration::Calibration;
    ///
    /// let cal = Calibration::linear();
    /// assert_eq!(cal.apply(0).get(), 0.0);
    /// assert_eq!(cal.apply(i16::MIN).get(), 1.0);
    /// ```
    #[must_use]
    pub fn apply(&self, raw: i16) -> Magnitude {
        let magnitude = normalize_axis(raw as i32);
        if magnitude.get() <= self.deadzone && self.deadzone > 0.0 {
            Magnitude::ZERO
        } else {
            magnitude
        }
    }
}

/// Scales an absolute raw value against [`AXIS_MAX_VALUE`].
///
/// Values beyond the nominal maximum clamp to 1.0 rather than fault.
#[must_use]
pub fn normalize_axis(raw: i32) -> Magnitude {
    Magnitude::new(raw.unsigned_abs() as f32 / AXIS_MAX_VALUE as f32)
}
