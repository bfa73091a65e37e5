//! The memoization cache: store, lookup orchestration, and eviction.

use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

use super::recency::{NodeHandle, RecencyList};
use super::slot::{CostedValue, Slot};
use super::stats::CacheStats;
use crate::config::{CacheConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAX_BYTES};

/// Structural record for one mapped key.
struct Entry<V> {
    slot: Arc<Slot<V>>,
    node: NodeHandle,
}

/// Key map plus recency list; mutated only under the structural lock.
///
/// Invariant: `map.len() == recency.len()`, and every mapped key owns exactly
/// one recency node.
struct Store<K, V> {
    map: FxHashMap<K, Entry<V>>,
    recency: RecencyList<K>,
}

impl<K, V> Store<K, V>
where
    K: Hash + Eq + Clone,
{
    fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            recency: RecencyList::with_capacity(capacity),
        }
    }

    /// Returns the slot for `key`, creating it on a miss.
    ///
    /// A hit splices the recency node to the most-recently-used end. The
    /// boolean is `true` on a hit. Creating the slot under the structural
    /// lock guarantees at most one slot exists per key at a time.
    fn find_or_create(&mut self, key: &K) -> (Arc<Slot<V>>, bool) {
        if let Some(entry) = self.map.get(key) {
            let slot = Arc::clone(&entry.slot);
            let node = entry.node;
            self.recency.move_to_back(node);
            return (slot, true);
        }

        let slot = Arc::new(Slot::new());
        let node = self.recency.push_back(key.clone());
        self.map.insert(
            key.clone(),
            Entry {
                slot: Arc::clone(&slot),
                node,
            },
        );
        (slot, false)
    }
}

/// Thread-safe, size-bounded memoization cache with approximate-LRU eviction.
///
/// Values are built lazily by a caller-supplied builder and handed out as
/// [`Arc<V>`]; a returned value stays valid after its entry is evicted. The
/// builder never runs under the cache-wide lock, so slow constructions for
/// independent keys proceed in parallel while bookkeeping stays serialized
/// and cheap.
pub struct MemoCache<K, V> {
    /// Structural lock: key map, recency order, O(1) bookkeeping only.
    inner: Mutex<Store<K, V>>,
    /// Configured byte budget; mutable at runtime.
    max_size: AtomicU64,
    /// Running total of accounted bytes.
    curr_size: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    build_failures: AtomicU64,
    evictions: AtomicU64,
}

impl<K, V> MemoCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache with the given byte budget.
    ///
    /// A budget of `0` disables caching: every lookup invokes the builder
    /// directly and nothing is retained.
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self::with_settings(max_bytes, DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates a cache from a validated configuration.
    pub fn with_config(config: &CacheConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::with_settings(
            config.max_bytes,
            config.initial_capacity,
        ))
    }

    fn with_settings(max_bytes: u64, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Store::with_capacity(capacity)),
            max_size: AtomicU64::new(max_bytes),
            curr_size: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            build_failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Returns the cached value for `key`, building it if necessary.
    ///
    /// The builder reports the value together with its byte cost (clamped to
    /// at least 1 when charged against the budget). Concurrent calls for the
    /// same key invoke the builder at most once; losers block until the
    /// winner finishes and receive its value. Builder errors propagate to
    /// the triggering caller and leave the entry retryable.
    ///
    /// The call that successfully builds a value also charges its size and
    /// runs the eviction scan, so the budget is enforced lazily by whichever
    /// lookup pushes the total over the limit.
    pub fn get_or_build<F, E>(&self, key: K, build: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Result<CostedValue<V>, E>,
    {
        // Disabled mode: zero budget and nothing accounted. Bypass the store
        // entirely; no entry is created.
        if self.max_size.load(Ordering::Acquire) == 0
            && self.curr_size.load(Ordering::Acquire) == 0
        {
            return match build() {
                Ok(built) => {
                    self.builds.fetch_add(1, Ordering::Relaxed);
                    Ok(Arc::new(built.value))
                }
                Err(err) => {
                    self.build_failures.fetch_add(1, Ordering::Relaxed);
                    Err(err)
                }
            };
        }

        // Structural lock held only for the lookup. The slot is shared, so
        // it survives even if another thread evicts the entry while we build.
        let (slot, hit) = {
            let mut store = self.inner.lock();
            store.find_or_create(&key)
        };
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        // Builder runs here without the structural lock.
        let (value, winner) = match slot.materialize(build) {
            Ok(result) => result,
            Err(err) => {
                self.build_failures.fetch_add(1, Ordering::Relaxed);
                warn!("builder failed; entry left retryable");
                return Err(err);
            }
        };

        if winner {
            self.builds.fetch_add(1, Ordering::Relaxed);
            let mut reclaimed: Vec<Arc<Slot<V>>> = Vec::new();
            {
                let mut store = self.inner.lock();
                // The entry may have been evicted or replaced while we were
                // building; credit the size only if this exact slot is still
                // the one mapped under the key.
                match store.map.get(&key) {
                    Some(entry) if Arc::ptr_eq(&entry.slot, &slot) => {
                        let size = slot.accredit();
                        self.curr_size.fetch_add(size, Ordering::AcqRel);
                    }
                    _ => trace!("entry dropped during build; size not credited"),
                }
                self.evict_over_budget(&mut store, &mut reclaimed);
                debug_assert_eq!(store.map.len(), store.recency.len());
            }
            if !reclaimed.is_empty() {
                self.evictions
                    .fetch_add(reclaimed.len() as u64, Ordering::Relaxed);
                debug!(count = reclaimed.len(), "evicted entries over budget");
            }
            // Value destructors run here, outside the structural lock.
            drop(reclaimed);
        }

        Ok(value)
    }

    /// Returns the value for `key` if it is present and built.
    ///
    /// Does not update recency and does not touch statistics.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        let store = self.inner.lock();
        let entry = store.map.get(key)?;
        entry
            .slot
            .state()
            .is_built()
            .then(|| entry.slot.published_value())
    }

    /// Sets the byte budget.
    ///
    /// Shrinking does not evict immediately; eviction happens lazily on the
    /// next lookup that increases the accounted total.
    pub fn set_max_size(&self, max_bytes: u64) {
        self.max_size.store(max_bytes, Ordering::Release);
    }

    /// Returns the configured byte budget.
    #[must_use]
    pub fn max_size(&self) -> u64 {
        self.max_size.load(Ordering::Acquire)
    }

    /// Returns the accounted byte total.
    ///
    /// Reflects only fully accounted entries; values mid-construction are
    /// not yet charged.
    #[must_use]
    pub fn curr_size(&self) -> u64 {
        self.curr_size.load(Ordering::Acquire)
    }

    /// Returns the number of mapped entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Returns true if no entries are mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().map.is_empty()
    }

    /// Removes all entries and resets the accounted total.
    ///
    /// Values still referenced by callers stay alive; their slots are
    /// dropped outside the structural lock.
    pub fn clear(&self) {
        let removed: Vec<Arc<Slot<V>>> = {
            let mut store = self.inner.lock();
            store.recency.clear();
            let removed = store.map.drain().map(|(_, entry)| entry.slot).collect();
            self.curr_size.store(0, Ordering::Release);
            removed
        };
        drop(removed);
    }

    /// Returns point-in-time statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            build_failures: self.build_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.inner.lock().map.len(),
            bytes: self.curr_size.load(Ordering::Acquire),
        }
    }

    /// Greedy oldest-first eviction while the accounted total exceeds the
    /// budget.
    ///
    /// Entries still racing toward `Accounted` (`Empty`, `BuiltUnaccounted`)
    /// are skipped rather than blocked on or evicted: the accounting
    /// transition needs the structural lock this scan already holds, so no
    /// candidate can become `Accounted` mid-scan. Removed slots go onto
    /// `reclaimed` and are dropped by the caller after the lock is released.
    fn evict_over_budget(&self, store: &mut Store<K, V>, reclaimed: &mut Vec<Arc<Slot<V>>>) {
        let mut cursor = store.recency.front();
        while self.curr_size.load(Ordering::Acquire) > self.max_size.load(Ordering::Acquire) {
            let Some(handle) = cursor else { break };
            cursor = store.recency.next(handle);

            let state = {
                let key = store.recency.key(handle);
                match store.map.get(key) {
                    Some(entry) => entry.slot.state(),
                    None => unreachable!("recency node without map entry"),
                }
            };
            if !state.is_evictable() {
                continue;
            }

            let key = store.recency.remove(handle);
            let entry = store
                .map
                .remove(&key)
                .unwrap_or_else(|| unreachable!("recency node without map entry"));
            // Zero for entries whose build failed.
            let freed = entry.slot.accounted_size();
            debug_assert!(self.curr_size.load(Ordering::Acquire) >= freed);
            self.curr_size.fetch_sub(freed, Ordering::AcqRel);
            reclaimed.push(entry.slot);
        }
    }
}

impl<K, V> Default for MemoCache<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl<K, V> Drop for MemoCache<K, V> {
    fn drop(&mut self) {
        // Teardown consistency audit, debug builds only.
        if cfg!(debug_assertions) {
            let store = self.inner.get_mut();
            debug_assert_eq!(store.map.len(), store.recency.len());
            debug_assert_eq!(store.map.is_empty(), store.recency.is_empty());
            let accounted: u64 = store
                .map
                .values()
                .map(|entry| entry.slot.accounted_size())
                .sum();
            debug_assert_eq!(accounted, self.curr_size.load(Ordering::Acquire));
        }
    }
}
