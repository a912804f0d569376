//! Telemetry record types.

use chrono::{DateTime, Utc};

/// Flight status reported by the drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlightStatus {
    /// Remaining battery (0-100%).
    pub battery_percentage: u8,
    /// Height above takeoff point in cm.
    pub height_cm: i32,
    /// Motor-on time in seconds.
    pub flight_time_s: u32,
}

/// Wireless link quality reported by the drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkQuality {
    /// Signal strength (SNR, higher is better).
    pub strength: u8,
    /// Interference level (lower is better).
    pub disturbance: u8,
}

/// An immutable telemetry value as stored by the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T> {
    /// Cache-wide write counter; strictly increasing across both slots.
    pub sequence: u64,
    pub received_at: DateTime<Utc>,
    pub value: T,
}

/// Latest value of each telemetry slot at the time of the read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetrySnapshot {
    pub flight: Option<Stamped<FlightStatus>>,
    pub link: Option<Stamped<LinkQuality>>,
}

impl TelemetrySnapshot {
    #[must_use]
    pub fn battery_percentage(&self) -> Option<u8> {
        self.flight.as_ref().map(|f| f.value.battery_percentage)
    }

    #[must_use]
    pub fn link_strength(&self) -> Option<u8> {
        self.link.as_ref().map(|l| l.value.strength)
    }

    #[must_use]
    pub fn link_disturbance(&self) -> Option<u8> {
        self.link.as_ref().map(|l| l.value.disturbance)
    }

    /// One-line operator status, e.g. `Battery: 87% | Wifi: 90 0`.
    #[must_use]
    pub fn status_line(&self) -> String {
        let battery = match self.battery_percentage() {
            Some(pct) => format!("{}%", pct),
            None => "unknown".to_string(),
        };
        let wifi = match &self.link {
            Some(link) => format!("{} {}", link.value.strength, link.value.disturbance),
            None => "unknown".to_string(),
        };
        format!("Battery: {} | Wifi: {}", battery, wifi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot_status_line() {
        let snapshot = TelemetrySnapshot::default();
        assert_eq!(snapshot.battery_percentage(), None);
        assert_eq!(snapshot.link_strength(), None);
        assert_eq!(snapshot.status_line(), "Battery: unknown | Wifi: unknown");
    }

    #[test]
    fn test_full_snapshot_status_line() {
        let snapshot = TelemetrySnapshot {
            flight: Some(Stamped {
                sequence: 1,
                received_at: Utc::now(),
                value: FlightStatus { battery_percentage: 87, ..Default::default() },
            }),
            link: Some(Stamped {
                sequence: 2,
                received_at: Utc::now(),
                value: LinkQuality { strength: 90, disturbance: 3 },
            }),
        };
        assert_eq!(snapshot.battery_percentage(), Some(87));
        assert_eq!(snapshot.link_disturbance(), Some(3));
        assert_eq!(snapshot.status_line(), "Battery: 87% | Wifi: 90 3");
    }
}
