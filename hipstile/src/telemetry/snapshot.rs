//! Display-ready copy of the loader counters.

use std::fmt;
use std::time::Duration;

/// Point-in-time copy of the loader counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub requests_started: u64,
    pub requests_coalesced: u64,
    pub requests_completed: u64,
    pub requests_failed: u64,
    pub not_found: u64,
    pub network_errors: u64,
    pub decode_errors: u64,
    pub bytes_downloaded: u64,
    pub in_flight: u64,
    pub bytes_per_second: f64,
}

impl TelemetrySnapshot {
    /// Fraction of finished requests that failed.
    pub fn failure_rate(&self) -> f64 {
        let finished = self.requests_completed + self.requests_failed;
        if finished == 0 {
            0.0
        } else {
            self.requests_failed as f64 / finished as f64
        }
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests ({} ok, {} failed, {} in flight), {:.1} KB downloaded",
            self.requests_started,
            self.requests_completed,
            self.requests_failed,
            self.in_flight,
            self.bytes_downloaded as f64 / 1024.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_rate() {
        let snapshot = TelemetrySnapshot {
            requests_completed: 3,
            requests_failed: 1,
            ..TelemetrySnapshot::default()
        };
        assert!((snapshot.failure_rate() - 0.25).abs() < f64::EPSILON);
        assert_eq!(TelemetrySnapshot::default().failure_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let snapshot = TelemetrySnapshot {
            requests_started: 2,
            requests_completed: 2,
            bytes_downloaded: 2048,
            ..TelemetrySnapshot::default()
        };
        assert_eq!(
            snapshot.to_string(),
            "2 requests (2 ok, 0 failed, 0 in flight), 2.0 KB downloaded"
        );
    }
}
