//! Loader telemetry for observability and user feedback.
//!
//! Tile loads are instrumented with lock-free atomic counters so recording
//! an event costs a single relaxed add on the hot path.
//!
//! # Architecture
//!
//! ```text
//! TileLoader ─────► LoaderMetrics ─────► TelemetrySnapshot ─────► Views
//!                   (atomic counters)    (point-in-time copy)     (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```
//! use hipstile::telemetry::LoaderMetrics;
//!
//! let metrics = LoaderMetrics::new();
//! metrics.request_started();
//! metrics.bytes_downloaded(12_288);
//! metrics.request_completed();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.requests_completed, 1);
//! assert_eq!(snapshot.in_flight, 0);
//! ```

mod metrics;
mod snapshot;

pub use metrics::LoaderMetrics;
pub use snapshot::TelemetrySnapshot;
