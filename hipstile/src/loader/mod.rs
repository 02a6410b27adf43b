//! Asynchronous tile loader.
//!
//! The loader turns a cache miss into at most one background task:
//!
//! ```text
//! request ──► try_begin_load ──► fetch (transport) ──► decode ──► complete_load
//!                  │                                     │
//!                  └── already owned: return             └── error: fail_load
//! ```
//!
//! Fetches are bounded by a semaphore; decoding runs on the blocking pool
//! unless the decoder is passthrough. Each request ends in exactly one
//! `complete_load` or `fail_load`. There is no retry inside a request; the
//! cache's error backoff decides when a failed tile may be requested again.

mod error;
pub mod url;

use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::{debug, trace, warn};

use crate::cache::{TileCache, TileErrorCode};
use crate::decode::{DecodedTile, TileDecoder, TileSource};
use crate::healpix::HealpixAddress;
use crate::telemetry::LoaderMetrics;
use crate::transport::{AutoTransport, Transport, TransportConfig, TransportError};

pub use error::LoadError;

/// Default number of concurrent fetches.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

/// Loader settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Maximum fetches in flight at once.
    pub max_concurrent: usize,
    pub transport: TransportConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            transport: TransportConfig::default(),
        }
    }
}

/// One tile load: where to fetch it, how to decode it, where to store it.
pub struct LoadJob<T> {
    pub cache: Arc<TileCache<T>>,
    pub decoder: Arc<dyn TileDecoder<T>>,
    pub address: HealpixAddress,
    pub url: String,
}

/// Schedules fetch and decode work on a tokio runtime.
///
/// Cheap to share: surveys hold it behind an `Arc`.
pub struct TileLoader {
    transport: Arc<dyn Transport>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    metrics: Arc<LoaderMetrics>,
}

impl TileLoader {
    pub fn new(transport: Arc<dyn Transport>, runtime: Handle, config: &LoaderConfig) -> Self {
        Self {
            transport,
            runtime,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            metrics: Arc::new(LoaderMetrics::new()),
        }
    }

    /// Build a loader that serves `http(s)` URLs over the network and other
    /// URLs from disk.
    pub fn from_config(config: &LoaderConfig, runtime: Handle) -> Result<Self, TransportError> {
        let transport = AutoTransport::new(&config.transport)?;
        Ok(Self::new(Arc::new(transport), runtime, config))
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn metrics(&self) -> Arc<LoaderMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Fetch a resource directly, within the concurrency limit.
    pub async fn fetch(&self, url: &str) -> Result<Bytes, TransportError> {
        fetch_limited(&*self.transport, &self.permits, &self.metrics, url).await
    }

    /// Start loading a tile unless a load for it is already owned elsewhere.
    ///
    /// Never blocks. Returns whether a new load was started.
    pub fn request<T>(&self, job: LoadJob<T>) -> bool
    where
        T: Send + Sync + 'static,
    {
        if !job.cache.try_begin_load(job.address) {
            self.metrics.request_coalesced();
            return false;
        }

        trace!(tile = %job.address, url = %job.url, "Scheduling tile load");
        self.metrics.request_started();

        let transport = Arc::clone(&self.transport);
        let permits = Arc::clone(&self.permits);
        let metrics = Arc::clone(&self.metrics);
        self.runtime.spawn(async move {
            let LoadJob {
                cache,
                decoder,
                address,
                url,
            } = job;

            let mut guard = UnwindGuard {
                cache: Arc::clone(&cache),
                metrics: Arc::clone(&metrics),
                address,
                armed: true,
            };
            let outcome = load_tile(&*transport, &permits, &metrics, decoder, address, &url).await;
            guard.armed = false;

            match outcome {
                Ok(decoded) => {
                    if !cache.complete_load(address, decoded.payload, decoded.cost, decoded.transparency)
                    {
                        trace!(tile = %address, "Discarding load result for closed cache");
                    }
                    metrics.request_completed();
                }
                Err(e) => {
                    let code = e.code();
                    debug!(tile = %address, url = %url, error = %e, "Tile load failed");
                    cache.fail_load(address, code);
                    metrics.request_failed(code);
                }
            }
        });
        true
    }
}

/// Fails a tile whose load task unwinds (a panicking decoder) or is dropped
/// before it produced an outcome, so the key does not stay `Loading`.
struct UnwindGuard<T> {
    cache: Arc<TileCache<T>>,
    metrics: Arc<LoaderMetrics>,
    address: HealpixAddress,
    armed: bool,
}

impl<T> Drop for UnwindGuard<T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(tile = %self.address, "Tile load task ended without an outcome");
        self.cache.fail_load(self.address, TileErrorCode::Decode);
        self.metrics.request_failed(TileErrorCode::Decode);
    }
}

async fn load_tile<T>(
    transport: &dyn Transport,
    permits: &Semaphore,
    metrics: &LoaderMetrics,
    decoder: Arc<dyn TileDecoder<T>>,
    address: HealpixAddress,
    url: &str,
) -> Result<DecodedTile<T>, LoadError>
where
    T: Send + 'static,
{
    let data = fetch_limited(transport, permits, metrics, url).await?;
    decode(decoder, TileSource::Tile(address), data).await
}

async fn fetch_limited(
    transport: &dyn Transport,
    permits: &Semaphore,
    metrics: &LoaderMetrics,
    url: &str,
) -> Result<Bytes, TransportError> {
    let _permit = permits
        .acquire()
        .await
        .map_err(|_| TransportError::Request("loader is shut down".to_string()))?;
    let data = transport.fetch(url).await?;
    metrics.bytes_downloaded(data.len() as u64);
    Ok(data)
}

/// Decode on the blocking pool unless the decoder is passthrough.
pub(crate) async fn decode<T>(
    decoder: Arc<dyn TileDecoder<T>>,
    source: TileSource,
    data: Bytes,
) -> Result<DecodedTile<T>, LoadError>
where
    T: Send + 'static,
{
    if decoder.passthrough() {
        return Ok(decoder.decode(source, data)?);
    }
    let decoded = tokio::task::spawn_blocking(move || decoder.decode(source, data))
        .await
        .map_err(|e| LoadError::Task(e.to_string()))??;
    Ok(decoded)
}
