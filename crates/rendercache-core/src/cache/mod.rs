//! Memoization cache for derived graphics artifacts.
//!
//! # Thread-Safety & Lock Ordering
//!
//! Two lock domains exist and are never held simultaneously:
//!
//! 1. `MemoCache.inner` (structural `Mutex`): guards the key map, the recency
//!    list, and size accounting. Held only for O(1) bookkeeping.
//! 2. `Slot.build_lock` (construction `Mutex`, one per entry): guards the
//!    builder invocation. Never acquired while the structural lock is held,
//!    and vice versa.
//!
//! Evicted slots are collected under the structural lock but dropped after it
//! is released, so arbitrary value destructors never run inside a critical
//! section.

mod memo;
mod recency;
mod slot;
mod stats;

pub use memo::MemoCache;
pub use slot::CostedValue;
pub use stats::CacheStats;

#[cfg(test)]
mod tests;
