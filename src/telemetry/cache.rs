//! # Telemetry Cache
//!
//! Holds the most recent flight status and link quality.
//!
//! Each slot is its own `watch` channel: a write replaces the whole value in
//! one step, so a reader on another task never sees fields from two different
//! updates mixed together, and the two slots never contend with each other.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::trace;

use super::types::{FlightStatus, LinkQuality, Stamped, TelemetrySnapshot};

/// Last-known telemetry, shared between the vehicle and controller tasks.
#[derive(Debug)]
pub struct TelemetryCache {
    flight: watch::Sender<Option<Stamped<FlightStatus>>>,
    link: watch::Sender<Option<Stamped<LinkQuality>>>,
    sequence: AtomicU64,
}

impl Default for TelemetryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryCache {
    #[must_use]
    pub fn new() -> Self {
        let (flight, _) = watch::channel(None);
        let (link, _) = watch::channel(None);
        Self {
            flight,
            link,
            sequence: AtomicU64::new(0),
        }
    }

    fn stamp<T>(&self, value: T) -> Stamped<T> {
        Stamped {
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            received_at: Utc::now(),
            value,
        }
    }

    /// Overwrites the flight-status slot.
    pub fn update_flight(&self, status: FlightStatus) {
        let stamped = self.stamp(status);
        trace!("Flight status #{}: {:?}", stamped.sequence, stamped.value);
        self.flight.send_replace(Some(stamped));
    }

    /// Overwrites the link-quality slot.
    pub fn update_link(&self, quality: LinkQuality) {
        let stamped = self.stamp(quality);
        trace!("Link quality #{}: {:?}", stamped.sequence, stamped.value);
        self.link.send_replace(Some(stamped));
    }

    #[must_use]
    pub fn flight(&self) -> Option<Stamped<FlightStatus>> {
        self.flight.borrow().clone()
    }

    #[must_use]
    pub fn link(&self) -> Option<Stamped<LinkQuality>> {
        self.link.borrow().clone()
    }

    /// Latest value of both slots.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            flight: self.flight(),
            link: self.link(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_cache() {
        let cache = TelemetryCache::new();
        assert!(cache.flight().is_none());
        assert!(cache.link().is_none());
        assert_eq!(cache.snapshot(), TelemetrySnapshot::default());
    }

    #[test]
    fn test_latest_write_wins() {
        let cache = TelemetryCache::new();
        cache.update_flight(FlightStatus { battery_percentage: 90, ..Default::default() });
        cache.update_flight(FlightStatus { battery_percentage: 85, ..Default::default() });

        assert_eq!(cache.snapshot().battery_percentage(), Some(85));
    }

    #[test]
    fn test_slots_are_independent() {
        let cache = TelemetryCache::new();
        cache.update_link(LinkQuality { strength: 70, disturbance: 2 });
        cache.update_flight(FlightStatus { battery_percentage: 50, ..Default::default() });
        cache.update_link(LinkQuality { strength: 60, disturbance: 5 });

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.battery_percentage(), Some(50));
        assert_eq!(snapshot.link_strength(), Some(60));
        assert_eq!(snapshot.link_disturbance(), Some(5));
    }

    #[test]
    fn test_sequence_increases_across_slots() {
        let cache = TelemetryCache::new();
        cache.update_flight(FlightStatus::default());
        cache.update_link(LinkQuality::default());
        cache.update_flight(FlightStatus::default());

        let snapshot = cache.snapshot();
        let flight_seq = snapshot.flight.unwrap().sequence;
        let link_seq = snapshot.link.unwrap().sequence;
        assert_eq!(link_seq, 2);
        assert_eq!(flight_seq, 3);
    }

    #[test]
    fn test_concurrent_writers_do_not_tear() {
        let cache = Arc::new(TelemetryCache::new());

        let flight_writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    let v = (i % 100) as u8;
                    cache.update_flight(FlightStatus {
                        battery_percentage: v,
                        height_cm: v as i32,
                        flight_time_s: v as u32,
                    });
                }
            })
        };
        let link_writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..1000u32 {
                    let v = (i % 100) as u8;
                    cache.update_link(LinkQuality { strength: v, disturbance: v });
                }
            })
        };

        // Every observed value must have all fields from the same write
        for _ in 0..1000 {
            if let Some(flight) = cache.flight() {
                let f = flight.value;
                assert_eq!(f.battery_percentage as i32, f.height_cm);
                assert_eq!(f.battery_percentage as u32, f.flight_time_s);
            }
            if let Some(link) = cache.link() {
                assert_eq!(link.value.strength, link.value.disturbance);
            }
        }

        flight_writer.join().unwrap();
        link_writer.join().unwrap();

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.battery_percentage(), Some(99));
        assert_eq!(snapshot.link_strength(), Some(99));
    }
}
