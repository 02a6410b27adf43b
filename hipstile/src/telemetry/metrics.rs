//! Loader counters.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use super::TelemetrySnapshot;
use crate::cache::TileErrorCode;

/// Atomic counters updated by the tile loader.
#[derive(Debug)]
pub struct LoaderMetrics {
    started_at: Instant,
    requests_started: AtomicU64,
    requests_coalesced: AtomicU64,
    requests_completed: AtomicU64,
    requests_failed: AtomicU64,
    not_found: AtomicU64,
    network_errors: AtomicU64,
    decode_errors: AtomicU64,
    bytes_downloaded: AtomicU64,
    in_flight: AtomicU64,
}

impl Default for LoaderMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_started: AtomicU64::new(0),
            requests_coalesced: AtomicU64::new(0),
            requests_completed: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            not_found: AtomicU64::new(0),
            network_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            bytes_downloaded: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
        }
    }

    pub fn request_started(&self) {
        self.requests_started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// A request found the tile already loading, loaded or backing off.
    pub fn request_coalesced(&self) {
        self.requests_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_completed(&self) {
        self.requests_completed.fetch_add(1, Ordering::Relaxed);
        self.finish();
    }

    pub fn request_failed(&self, code: TileErrorCode) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        let counter = match code {
            TileErrorCode::NotFound => &self.not_found,
            TileErrorCode::Decode => &self.decode_errors,
            TileErrorCode::Network | TileErrorCode::OutOfRange => &self.network_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.finish();
    }

    pub fn bytes_downloaded(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    fn finish(&self) {
        // Saturate instead of wrapping if a finish is ever unpaired.
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Copy the counters into a snapshot.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let uptime = self.started_at.elapsed();
        let bytes = self.bytes_downloaded.load(Ordering::Relaxed);
        let secs = uptime.as_secs_f64();
        TelemetrySnapshot {
            uptime,
            requests_started: self.requests_started.load(Ordering::Relaxed),
            requests_coalesced: self.requests_coalesced.load(Ordering::Relaxed),
            requests_completed: self.requests_completed.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            network_errors: self.network_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            bytes_downloaded: bytes,
            in_flight: self.in_flight.load(Ordering::Relaxed),
            bytes_per_second: if secs > 0.0 { bytes as f64 / secs } else { 0.0 },
        }
    }
}
