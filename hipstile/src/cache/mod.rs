//! In-memory tile cache.
//!
//! The cache owns the lifecycle state of every tile a survey has asked
//! for and bounds the memory held by decoded payloads. See
//! [`TileCache`] for the state machine and eviction rules.

mod tile_cache;
mod types;

pub use tile_cache::{EvictionListener, TileCache};
pub use types::{
    CacheConfig, CacheStats, EvictionResult, TileErrorCode, TileState, TileView, Transparency,
    DEFAULT_BUDGET_BYTES, DEFAULT_ERROR_BACKOFF,
};
