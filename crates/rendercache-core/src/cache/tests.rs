//! Functional tests for `MemoCache`.

use std::cell::Cell;
use std::convert::Infallible;

use proptest::prelude::*;

use super::{CostedValue, MemoCache};
use crate::config::DEFAULT_MAX_BYTES;

fn build_sized(value: u64, size: u64) -> impl FnOnce() -> Result<CostedValue<u64>, Infallible> {
    move || Ok(CostedValue::new(value, size))
}

// ========== Basic operations ==========

#[test]
fn test_new_cache_is_empty() {
    let cache: MemoCache<String, u64> = MemoCache::new(1024);
    assert!(cache.is_empty());
    assert_eq!(cache.len(), 0);
    assert_eq!(cache.curr_size(), 0);
    assert_eq!(cache.max_size(), 1024);
}

#[test]
fn test_default_uses_config_budget() {
    let cache: MemoCache<String, u64> = MemoCache::default();
    assert_eq!(cache.max_size(), DEFAULT_MAX_BYTES);
}

#[test]
fn test_miss_builds_and_hit_reuses() {
    let cache: MemoCache<&str, u64> = MemoCache::new(1024);
    let calls = Cell::new(0u32);

    let first = cache
        .get_or_build("key", || {
            calls.set(calls.get() + 1);
            Ok::<_, Infallible>(CostedValue::new(42, 8))
        })
        .unwrap();

    let second = cache
        .get_or_build("key", || {
            calls.set(calls.get() + 1);
            Ok::<_, Infallible>(CostedValue::new(999, 8))
        })
        .unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(*first, 42);
    assert_eq!(*second, 42);
    assert_eq!(cache.curr_size(), 8);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_zero_reported_size_charged_as_one() {
    let cache: MemoCache<&str, u64> = MemoCache::new(1024);
    let _ = cache.get_or_build("key", build_sized(1, 0)).unwrap();
    assert_eq!(cache.curr_size(), 1);
}

#[test]
fn test_peek_does_not_build() {
    let cache: MemoCache<&str, u64> = MemoCache::new(1024);
    assert!(cache.peek(&"missing").is_none());

    let _ = cache.get_or_build("key", build_sized(5, 10)).unwrap();
    assert_eq!(cache.peek(&"key").as_deref(), Some(&5));
}

// ========== Capacity & eviction ==========

#[test]
fn test_budget_example_six_plus_six_over_ten() {
    // MaxSize=10; a(6) then b(6): 12 > 10, LRU evicts "a".
    let cache: MemoCache<&str, u64> = MemoCache::new(10);

    let _ = cache.get_or_build("a", build_sized(1, 6)).unwrap();
    let _ = cache.get_or_build("b", build_sized(2, 6)).unwrap();

    assert_eq!(cache.curr_size(), 6);
    assert!(cache.peek(&"a").is_none());
    assert_eq!(cache.peek(&"b").as_deref(), Some(&2));
}

#[test]
fn test_lru_preference_touch_protects_entry() {
    // Capacity for exactly 3 unit-sized entries: access 1..3, re-access 1,
    // insert 4. Key 2 is now the least recently used and must go.
    let cache: MemoCache<u32, u64> = MemoCache::new(3);

    for key in 1..=3 {
        let _ = cache.get_or_build(key, build_sized(u64::from(key), 1)).unwrap();
    }
    let _ = cache.get_or_build(1, build_sized(0, 1)).unwrap(); // hit, no build

    let _ = cache.get_or_build(4, build_sized(4, 1)).unwrap();

    assert!(cache.peek(&2).is_none());
    assert!(cache.peek(&1).is_some());
    assert!(cache.peek(&3).is_some());
    assert!(cache.peek(&4).is_some());
    assert_eq!(cache.curr_size(), 3);
}

#[test]
fn test_oversized_entry_evicts_itself() {
    let cache: MemoCache<&str, u64> = MemoCache::new(10);

    let value = cache.get_or_build("huge", build_sized(7, 100)).unwrap();

    // The caller keeps the value even though the entry could not stay.
    assert_eq!(*value, 7);
    assert_eq!(cache.curr_size(), 0);
    assert!(cache.peek(&"huge").is_none());
}

#[test]
fn test_value_survives_eviction() {
    let cache: MemoCache<&str, u64> = MemoCache::new(10);

    let held = cache.get_or_build("a", build_sized(11, 6)).unwrap();
    let _ = cache.get_or_build("b", build_sized(22, 6)).unwrap();

    assert!(cache.peek(&"a").is_none());
    assert_eq!(*held, 11);
}

#[test]
fn test_set_max_size_evicts_lazily() {
    let cache: MemoCache<&str, u64> = MemoCache::new(100);
    let _ = cache.get_or_build("old", build_sized(1, 10)).unwrap();

    cache.set_max_size(5);
    // Shrinking alone does not evict.
    assert_eq!(cache.curr_size(), 10);

    // The next size-increasing lookup enforces the new budget.
    let _ = cache.get_or_build("new", build_sized(2, 1)).unwrap();
    assert_eq!(cache.curr_size(), 1);
    assert!(cache.peek(&"old").is_none());
    assert!(cache.peek(&"new").is_some());
}

// ========== Disabled mode ==========

#[test]
fn test_zero_capacity_bypasses_cache() {
    let cache: MemoCache<&str, u64> = MemoCache::new(0);
    let calls = Cell::new(0u32);

    for _ in 0..3 {
        let value = cache
            .get_or_build("key", || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(CostedValue::new(9, 100))
            })
            .unwrap();
        assert_eq!(*value, 9);
    }

    assert_eq!(calls.get(), 3);
    assert_eq!(cache.curr_size(), 0);
    assert!(cache.is_empty());
}

// ========== Builder failure ==========

#[test]
fn test_builder_error_propagates_and_entry_retries() {
    let cache: MemoCache<&str, u64> = MemoCache::new(1024);

    let err = cache
        .get_or_build("key", || Err::<CostedValue<u64>, _>("compile error".to_string()))
        .unwrap_err();
    assert_eq!(err, "compile error");
    assert_eq!(cache.curr_size(), 0);
    assert!(cache.peek(&"key").is_none());

    let value = cache
        .get_or_build("key", || Ok::<_, String>(CostedValue::new(3, 16)))
        .unwrap();
    assert_eq!(*value, 3);
    assert_eq!(cache.curr_size(), 16);

    let stats = cache.stats();
    assert_eq!(stats.build_failures, 1);
    assert_eq!(stats.builds, 1);
}

#[test]
fn test_failed_entry_reclaimed_by_eviction_scan() {
    let cache: MemoCache<&str, u64> = MemoCache::new(10);

    let _ = cache
        .get_or_build("bad", || Err::<CostedValue<u64>, _>("boom".to_string()))
        .unwrap_err();
    assert_eq!(cache.len(), 1);

    // The failed entry has zero accounted size; a size-driven scan removes it.
    let _ = cache.get_or_build("a", build_sized(1, 6)).unwrap();
    let _ = cache.get_or_build("b", build_sized(2, 6)).unwrap();

    assert!(cache.peek(&"bad").is_none());
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.curr_size(), 6);
}

// ========== Stats & maintenance ==========

#[test]
fn test_stats_track_hits_and_misses() {
    let cache: MemoCache<u32, u64> = MemoCache::new(1024);

    let _ = cache.get_or_build(1, build_sized(1, 1)).unwrap();
    let _ = cache.get_or_build(1, build_sized(1, 1)).unwrap();
    let _ = cache.get_or_build(2, build_sized(2, 1)).unwrap();

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.builds, 2);
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.bytes, 2);
    assert!((stats.hit_rate() - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_clear_resets_but_keeps_caller_values() {
    let cache: MemoCache<&str, u64> = MemoCache::new(1024);
    let held = cache.get_or_build("a", build_sized(5, 10)).unwrap();
    let _ = cache.get_or_build("b", build_sized(6, 10)).unwrap();

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.curr_size(), 0);
    assert!(cache.peek(&"a").is_none());
    assert_eq!(*held, 5);

    // The cache stays usable after clear.
    let value = cache.get_or_build("a", build_sized(7, 10)).unwrap();
    assert_eq!(*value, 7);
}

// ========== Properties ==========

proptest! {
    /// Sequentially, the accounted total never exceeds the budget after a
    /// lookup returns: the winning call always runs the eviction scan.
    #[test]
    fn prop_budget_never_exceeded(
        ops in prop::collection::vec((0u32..16, 0u64..300), 1..200),
    ) {
        let cache: MemoCache<u32, u64> = MemoCache::new(1000);
        for (key, size) in ops {
            let _ = cache.get_or_build(key, build_sized(u64::from(key), size)).unwrap();
            prop_assert!(cache.curr_size() <= 1000);
        }
    }
}
