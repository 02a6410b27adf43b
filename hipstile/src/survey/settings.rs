//! Per-survey settings: decoder, defaults, cache budget and lookup flags.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::Arc;

use crate::cache::CacheConfig;
use crate::decode::TileDecoder;
use crate::properties::PropertyDefaults;

/// Per-call tile lookup flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TileFlags(u8);

impl TileFlags {
    pub const NONE: TileFlags = TileFlags(0);
    /// Survey renders a planet surface.
    pub const PLANET: TileFlags = TileFlags(1 << 0);
    /// Resolve straight to the allsky texture.
    pub const FORCE_USE_ALLSKY: TileFlags = TileFlags(1 << 1);
    /// Only report cached data; never start a load.
    pub const CACHED_ONLY: TileFlags = TileFlags(1 << 2);

    pub fn contains(&self, other: TileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl BitOr for TileFlags {
    type Output = TileFlags;

    fn bitor(self, rhs: TileFlags) -> TileFlags {
        TileFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TileFlags {
    fn bitor_assign(&mut self, rhs: TileFlags) {
        self.0 |= rhs.0;
    }
}

/// How a survey decodes, caches and defaults its tiles.
pub struct SurveySettings<T> {
    pub decoder: Arc<dyn TileDecoder<T>>,
    /// Fallbacks used while, or instead of, the property file.
    pub defaults: PropertyDefaults,
    pub cache: CacheConfig,
    /// Survey-wide flags; `PLANET` marks planet-surface surveys.
    pub flags: TileFlags,
}

impl<T> SurveySettings<T> {
    pub fn new(decoder: Arc<dyn TileDecoder<T>>) -> Self {
        Self {
            decoder,
            defaults: PropertyDefaults::default(),
            cache: CacheConfig::default(),
            flags: TileFlags::NONE,
        }
    }

    pub fn with_defaults(mut self, defaults: PropertyDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_flags(mut self, flags: TileFlags) -> Self {
        self.flags = flags;
        self
    }
}

impl<T> fmt::Debug for SurveySettings<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurveySettings")
            .field("defaults", &self.defaults)
            .field("cache", &self.cache)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
