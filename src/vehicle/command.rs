//! # Vehicle Commands
//!
//! The closed set of motion primitives the pilot can send to the drone.
//!
//! Direction is always carried by the variant, never by the sign of a number:
//! a [`Magnitude`] is a fraction of full stick travel in `[0.0, 1.0]`.

use std::fmt;

/// Normalized command strength, guaranteed to lie in `[0.0, 1.0]`.
///
/// # Examples
///
/// ```
/// use tello_pilot::vehicle::command::Magnitude;
///
/// assert_eq!(Magnitude::new(0.5).get(), 0.5);
/// assert_eq!(Magnitude::new(1.7).get(), 1.0);
/// assert_eq!(Magnitude::new(-0.3).get(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Magnitude(f32);

impl Magnitude {
    /// Zero strength.
    pub const ZERO: Magnitude = Magnitude(0.0);
    /// Full strength.
    pub const FULL: Magnitude = Magnitude(1.0);

    /// Creates a magnitude, clamping into `[0.0, 1.0]`. NaN becomes zero.
    #[must_use]
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Returns the raw fraction.
    #[must_use]
    pub fn get(self) -> f32 {
        self.0
    }

    /// Scales the fraction to an integer percentage (0-100).
    #[must_use]
    pub fn percent(self) -> u8 {
        (self.0 * 100.0).round() as u8
    }
}

/// Translation directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Yaw directions, seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RotateDirection {
    Clockwise,
    CounterClockwise,
}

/// Flip directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlipDirection {
    Forward,
    Backward,
    Left,
    Right,
}

/// Speed tier reported back by a speed toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeedTier {
    #[default]
    Low,
    High,
}

impl SpeedTier {
    /// The other tier.
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            SpeedTier::Low => SpeedTier::High,
            SpeedTier::High => SpeedTier::Low,
        }
    }
}

impl fmt::Display for SpeedTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeedTier::Low => write!(f, "low"),
            SpeedTier::High => write!(f, "high"),
        }
    }
}

/// A single command addressed to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleCommand {
    Move {
        direction: MoveDirection,
        magnitude: Magnitude,
    },
    Rotate {
        direction: RotateDirection,
        magnitude: Magnitude,
    },
    Takeoff,
    /// Takeoff from a hand throw.
    ThrowTakeoff,
    Land,
    Flip(FlipDirection),
    ToggleBounce,
    ToggleSpeed,
    StartVideo,
    /// Video encoder bitrate level (0 = auto, 1-5 = Mbps).
    SetVideoRate(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnitude_clamps() {
        assert_eq!(Magnitude::new(0.25).get(), 0.25);
        assert_eq!(Magnitude::new(1.0001).get(), 1.0);
        assert_eq!(Magnitude::new(-1.0).get(), 0.0);
        assert_eq!(Magnitude::new(f32::NAN), Magnitude::ZERO);
        assert_eq!(Magnitude::new(f32::INFINITY), Magnitude::FULL);
    }

    #[test]
    fn test_magnitude_percent() {
        assert_eq!(Magnitude::ZERO.percent(), 0);
        assert_eq!(Magnitude::new(0.5).percent(), 50);
        assert_eq!(Magnitude::FULL.percent(), 100);
        assert_eq!(Magnitude::new(0.996).percent(), 100);
    }

    #[test]
    fn test_speed_tier_toggle() {
        assert_eq!(SpeedTier::default(), SpeedTier::Low);
        assert_eq!(SpeedTier::Low.toggled(), SpeedTier::High);
        assert_eq!(SpeedTier::High.toggled(), SpeedTier::Low);
        assert_eq!(SpeedTier::High.to_string(), "high");
    }
}
