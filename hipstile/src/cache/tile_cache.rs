//! Cost-bounded tile cache with an explicit per-tile lifecycle.
//!
//! Every tile moves through `Missing -> Loading -> Loaded | Error`. The
//! `Missing -> Loading` transition is a compare-and-set on the entry, so
//! at most one load is ever in flight for a given address no matter how
//! many threads ask for it. Loaded entries carry a decode cost; when the
//! summed cost exceeds the budget, least-recently-used entries are dropped
//! until the cache fits again.
//!
//! Entries touched since the last [`TileCache::begin_frame`] are pinned and
//! never evicted, so a traversal in progress cannot lose tiles it already
//! looked at. Before the first `begin_frame` call nothing is pinned.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::types::{
    CacheConfig, CacheStats, EvictionResult, TileErrorCode, TileState, TileView, Transparency,
};
use crate::healpix::HealpixAddress;

/// Callback invoked for every evicted entry with its address and cost.
pub type EvictionListener = Arc<dyn Fn(HealpixAddress, u64) + Send + Sync>;

struct LoadedSlot<T> {
    payload: Arc<T>,
    cost: u64,
    transparency: Transparency,
    last_used: AtomicU64,
    last_frame: AtomicU64,
}

enum Slot<T> {
    Loading { started: Instant },
    Loaded(LoadedSlot<T>),
    Failed { code: TileErrorCode, at: Instant },
}

/// Tile cache keyed by healpix address.
///
/// Payloads are stored behind `Arc` so lookups hand out cheap views and an
/// evicted payload stays valid for anyone still holding it.
pub struct TileCache<T> {
    slots: DashMap<u64, Slot<T>>,
    total_cost: AtomicU64,
    budget: AtomicU64,
    error_backoff: Duration,
    /// Monotonic LRU clock.
    tick: AtomicU64,
    /// Current frame number; zero means no frame has started.
    frame: AtomicU64,
    closed: AtomicBool,
    evicting: Mutex<()>,
    listener: Option<EvictionListener>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<T> TileCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            slots: DashMap::new(),
            total_cost: AtomicU64::new(0),
            budget: AtomicU64::new(config.budget_bytes),
            error_backoff: config.error_backoff,
            tick: AtomicU64::new(0),
            frame: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            evicting: Mutex::new(()),
            listener: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Register a callback run for each evicted entry.
    pub fn with_eviction_listener(mut self, listener: EvictionListener) -> Self {
        self.listener = Some(listener);
        self
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up a loaded tile, marking it as recently used.
    ///
    /// Returns `None` for every state other than `Loaded`.
    pub fn get(&self, address: HealpixAddress) -> Option<TileView<T>> {
        let view = self.slots.get(&address.uniq()).and_then(|slot| match &*slot {
            Slot::Loaded(loaded) => {
                loaded.last_used.store(self.next_tick(), Ordering::Relaxed);
                loaded
                    .last_frame
                    .store(self.frame.load(Ordering::Relaxed), Ordering::Relaxed);
                Some(TileView {
                    address,
                    payload: Arc::clone(&loaded.payload),
                    cost: loaded.cost,
                    transparency: loaded.transparency,
                })
            }
            _ => None,
        });

        if view.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        view
    }

    /// Current lifecycle state of a tile, without touching LRU order.
    pub fn state(&self, address: HealpixAddress) -> TileState {
        match self.slots.get(&address.uniq()).as_deref() {
            None => TileState::Missing,
            Some(Slot::Loading { .. }) => TileState::Loading,
            Some(Slot::Loaded(_)) => TileState::Loaded,
            Some(Slot::Failed { code, .. }) => TileState::Error(*code),
        }
    }

    /// Error code of a failed tile, if it is currently in `Error`.
    pub fn error(&self, address: HealpixAddress) -> Option<TileErrorCode> {
        match self.state(address) {
            TileState::Error(code) => Some(code),
            _ => None,
        }
    }

    /// Try to claim the load of a tile.
    ///
    /// Succeeds when the tile is `Missing`, or in `Error` for longer than the
    /// backoff. The entry is then `Loading` and the caller owns the load: it
    /// must finish with [`complete_load`](Self::complete_load) or
    /// [`fail_load`](Self::fail_load). Returns `false` when another load is
    /// already in flight, the tile is loaded, or the cache is closed.
    pub fn try_begin_load(&self, address: HealpixAddress) -> bool {
        if self.is_closed() {
            return false;
        }

        match self.slots.entry(address.uniq()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Loading {
                    started: Instant::now(),
                });
                true
            }
            Entry::Occupied(mut occupied) => {
                let retry = matches!(
                    occupied.get(),
                    Slot::Failed { at, .. } if at.elapsed() >= self.error_backoff
                );
                if retry {
                    trace!(tile = %address, "Retrying failed tile after backoff");
                    occupied.insert(Slot::Loading {
                        started: Instant::now(),
                    });
                }
                retry
            }
        }
    }

    /// Store a decoded payload for a tile that is `Loading`.
    ///
    /// No-op (the payload is dropped) when the tile is not `Loading` or the
    /// cache has been closed. Returns whether the payload was stored.
    pub fn complete_load(
        &self,
        address: HealpixAddress,
        payload: T,
        cost: u64,
        transparency: Transparency,
    ) -> bool {
        if self.is_closed() {
            return false;
        }

        let stored = match self.slots.get_mut(&address.uniq()) {
            Some(mut slot) => {
                let started = match &*slot {
                    Slot::Loading { started } => Some(*started),
                    _ => None,
                };
                match started {
                    Some(started) => {
                        trace!(
                            tile = %address,
                            cost,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Tile loaded"
                        );
                        *slot = Slot::Loaded(LoadedSlot {
                            payload: Arc::new(payload),
                            cost,
                            transparency,
                            last_used: AtomicU64::new(self.next_tick()),
                            last_frame: AtomicU64::new(0),
                        });
                        // Account while the shard is still locked so a concurrent
                        // removal always sees the cost it subtracts.
                        self.total_cost.fetch_add(cost, Ordering::Relaxed);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        };

        if stored {
            self.evict_if_needed();
        }
        stored
    }

    /// Record a failed load for a tile that is `Loading`.
    pub fn fail_load(&self, address: HealpixAddress, code: TileErrorCode) -> bool {
        match self.slots.get_mut(&address.uniq()) {
            Some(mut slot) if matches!(*slot, Slot::Loading { .. }) => {
                debug!(tile = %address, error = %code, "Tile load failed");
                *slot = Slot::Failed {
                    code,
                    at: Instant::now(),
                };
                true
            }
            _ => false,
        }
    }

    /// Drop a loaded or failed entry, returning it to `Missing`.
    ///
    /// In-flight loads are left alone so they keep their single owner.
    pub fn invalidate(&self, address: HealpixAddress) -> bool {
        let removed = self
            .slots
            .remove_if(&address.uniq(), |_, slot| {
                !matches!(slot, Slot::Loading { .. })
            });
        match removed {
            Some((_, Slot::Loaded(loaded))) => {
                self.total_cost.fetch_sub(loaded.cost, Ordering::Relaxed);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Start a new frame; entries used from now on are pinned until the next call.
    pub fn begin_frame(&self) -> u64 {
        self.frame.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Change the budget and evict down to it.
    pub fn set_budget(&self, budget_bytes: u64) -> EvictionResult {
        self.budget.store(budget_bytes, Ordering::Relaxed);
        self.evict_if_needed()
    }

    pub fn budget(&self) -> u64 {
        self.budget.load(Ordering::Relaxed)
    }

    /// Summed cost of all loaded entries.
    pub fn total_cost(&self) -> u64 {
        self.total_cost.load(Ordering::Relaxed)
    }

    /// Evict least-recently-used entries until the total cost fits the budget.
    ///
    /// Pinned entries are skipped, so the cache can stay over budget while a
    /// frame holds more than fits. Only one pass runs at a time; a concurrent
    /// call returns an empty result.
    pub fn evict_if_needed(&self) -> EvictionResult {
        let mut result = EvictionResult::default();
        let Some(_guard) = self.evicting.try_lock() else {
            return result;
        };

        let budget = self.budget();
        if self.total_cost() <= budget {
            return result;
        }

        let frame = self.frame.load(Ordering::Relaxed);
        let mut candidates: Vec<(u64, u64)> = self
            .slots
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Loaded(loaded) if !is_pinned(loaded, frame) => {
                    Some((*entry.key(), loaded.last_used.load(Ordering::Relaxed)))
                }
                _ => None,
            })
            .collect();
        candidates.sort_unstable_by_key(|&(_, used)| used);

        for (key, used) in candidates {
            if self.total_cost() <= budget {
                break;
            }
            // Skip entries touched since the scan.
            let removed = self.slots.remove_if(&key, |_, slot| match slot {
                Slot::Loaded(loaded) => {
                    loaded.last_used.load(Ordering::Relaxed) == used
                        && !is_pinned(loaded, frame)
                }
                _ => false,
            });
            if let Some((_, Slot::Loaded(loaded))) = removed {
                self.total_cost.fetch_sub(loaded.cost, Ordering::Relaxed);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                result.entries_removed += 1;
                result.bytes_freed += loaded.cost;
                if let (Some(listener), Some(address)) =
                    (&self.listener, HealpixAddress::from_uniq(key).ok())
                {
                    listener(address, loaded.cost);
                }
            }
        }

        if self.total_cost() > budget {
            warn!(
                size = self.total_cost(),
                budget, "Tile cache over budget; remaining entries are pinned"
            );
        }
        if result.entries_removed > 0 {
            debug!(%result, "Tile cache eviction");
        }
        result
    }

    /// Remove every entry that is not currently loading.
    pub fn clear(&self) {
        self.remove_all(|slot| !matches!(slot, Slot::Loading { .. }));
    }

    /// Tombstone the cache: all entries, including in-flight loads, are
    /// dropped and late completions become no-ops.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.remove_all(|_| true);
            debug!("Tile cache closed");
        }
    }

    fn remove_all<F>(&self, mut remove: F)
    where
        F: FnMut(&Slot<T>) -> bool,
    {
        let keys: Vec<u64> = self.slots.iter().map(|entry| *entry.key()).collect();
        for key in keys {
            if let Some((_, Slot::Loaded(loaded))) = self.slots.remove_if(&key, |_, slot| remove(slot)) {
                self.total_cost.fetch_sub(loaded.cost, Ordering::Relaxed);
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size_bytes: self.total_cost(),
            budget_bytes: self.budget(),
            ..CacheStats::default()
        };
        for entry in self.slots.iter() {
            match entry.value() {
                Slot::Loading { .. } => stats.loading_entries += 1,
                Slot::Loaded(_) => stats.loaded_entries += 1,
                Slot::Failed { .. } => stats.failed_entries += 1,
            }
        }
        stats
    }
}

fn is_pinned<T>(loaded: &LoadedSlot<T>, frame: u64) -> bool {
    frame != 0 && loaded.last_frame.load(Ordering::Relaxed) == frame
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_cost_stays_within_budget(
            budget in 1u64..64,
            costs in prop::collection::vec(1u64..16, 1..40),
        ) {
            let cache: TileCache<()> = TileCache::new(CacheConfig {
                budget_bytes: budget,
                error_backoff: Duration::ZERO,
            });
            let mut max_cost = 0;
            for (i, cost) in costs.iter().enumerate() {
                let a = HealpixAddress::new(8, i as u64).unwrap();
                prop_assert!(cache.try_begin_load(a));
                cache.complete_load(a, (), *cost, Transparency::OPAQUE);
                max_cost = max_cost.max(*cost);
                // Nothing is pinned, so eviction always reaches the budget
                // unless a single entry alone exceeds it.
                prop_assert!(cache.total_cost() <= budget.max(*cost));
            }
            let summed: u64 = (0..costs.len())
                .filter_map(|i| cache.get(HealpixAddress::new(8, i as u64).unwrap()))
                .map(|view| view.cost)
                .sum();
            prop_assert_eq!(summed, cache.total_cost());
            prop_assert!(cache.total_cost() <= budget + max_cost);
        }
    }
}
