//! Value types shared by the tile cache and its callers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::healpix::HealpixAddress;

/// Default cache budget in decoded bytes (512 MB).
pub const DEFAULT_BUDGET_BYTES: u64 = 512 * 1024 * 1024;

/// Default delay before a failed tile may be requested again.
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(30);

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum total decoded cost kept in the cache.
    pub budget_bytes: u64,
    /// Minimum time an `Error` entry is kept before a retry may start.
    pub error_backoff: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            budget_bytes: DEFAULT_BUDGET_BYTES,
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

/// Why a tile could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileErrorCode {
    /// Transport failure (connection, timeout, server error).
    Network,
    /// The server has no such tile.
    NotFound,
    /// The decoder rejected the payload.
    Decode,
    /// The tile lies outside the survey's declared orders.
    OutOfRange,
}

impl TileErrorCode {
    /// HTTP-like numeric code for callers that expect integer codes.
    pub fn code(&self) -> i32 {
        match self {
            TileErrorCode::Network => 598,
            TileErrorCode::NotFound => 404,
            TileErrorCode::Decode => 415,
            TileErrorCode::OutOfRange => 416,
        }
    }

    /// Whether this outcome can change on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TileErrorCode::Network | TileErrorCode::Decode)
    }
}

impl fmt::Display for TileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TileErrorCode::Network => "network error",
            TileErrorCode::NotFound => "not found",
            TileErrorCode::Decode => "decode error",
            TileErrorCode::OutOfRange => "out of range",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Lifecycle state of one tile in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Missing,
    Loading,
    Loaded,
    Error(TileErrorCode),
}

/// Four-bit hint marking child quadrants with no renderable content.
///
/// Bit `i` refers to child `4 * pix + i`, the same index returned by
/// [`HealpixAddress::quadrant`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Transparency(u8);

impl Transparency {
    /// Every child has content.
    pub const OPAQUE: Transparency = Transparency(0);

    /// Build from a bitmask; bits above the low four are ignored.
    pub fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Whether child quadrant `i` is known to be empty.
    pub fn is_child_empty(&self, i: u8) -> bool {
        i < 4 && self.0 & (1 << i) != 0
    }

    /// Mark child quadrant `i` as empty.
    pub fn with_empty_child(self, i: u8) -> Self {
        Self::from_bits(self.0 | (1 << (i & 3)))
    }
}

/// Snapshot handle to a loaded tile.
///
/// Holding a view keeps the payload alive even if the entry is evicted
/// meanwhile; the payload is dropped once the last view goes away.
#[derive(Debug)]
pub struct TileView<T> {
    pub address: HealpixAddress,
    pub payload: Arc<T>,
    pub cost: u64,
    pub transparency: Transparency,
}

impl<T> Clone for TileView<T> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            payload: Arc::clone(&self.payload),
            cost: self.cost,
            transparency: self.transparency,
        }
    }
}

/// Outcome of an eviction pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionResult {
    /// Number of entries removed.
    pub entries_removed: usize,
    /// Total cost freed.
    pub bytes_freed: u64,
}

impl fmt::Display for EvictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evicted {} entries, freed {} bytes",
            self.entries_removed, self.bytes_freed
        )
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub loaded_entries: usize,
    pub loading_entries: usize,
    pub failed_entries: usize,
    pub size_bytes: u64,
    pub budget_bytes: u64,
}

impl CacheStats {
    /// Fraction of lookups that found a loaded tile.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
