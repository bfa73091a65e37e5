//! Per-entry value slot and its lifecycle state machine.
//!
//! A [`Slot`] is the unit of shared ownership for one cached value. It is
//! referenced by the cache's store and by any in-flight callers, so eviction
//! of the store entry never invalidates a value a caller already holds: the
//! slot is freed when its last `Arc` drops.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle of one cached value.
///
/// ```text
/// Empty ──build ok──▶ BuiltUnaccounted ──accredit──▶ Accounted
///   │ ▲
///   ▼ │ retry
/// BuildFailed
/// ```
///
/// Only the `Accounted` transition requires the cache's structural lock;
/// every other transition happens under the slot's construction lock and is
/// published through an atomic store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SlotState {
    /// No value yet; a build may be in progress.
    Empty = 0,
    /// The last build attempt failed; the slot is retryable.
    BuildFailed = 1,
    /// Value built but not yet charged against the cache budget.
    BuiltUnaccounted = 2,
    /// Value built and charged; terminal state for a successful build.
    Accounted = 3,
}

impl SlotState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Empty,
            1 => Self::BuildFailed,
            2 => Self::BuiltUnaccounted,
            3 => Self::Accounted,
            _ => unreachable!("invalid slot state {raw}"),
        }
    }

    /// True if a value has been published and is safe to read without locks.
    pub(crate) fn is_built(self) -> bool {
        matches!(self, Self::BuiltUnaccounted | Self::Accounted)
    }

    /// True if the eviction scan may reclaim this entry.
    ///
    /// `Empty` and `BuiltUnaccounted` entries are racing toward `Accounted`
    /// elsewhere and must be skipped, never evicted.
    pub(crate) fn is_evictable(self) -> bool {
        matches!(self, Self::BuildFailed | Self::Accounted)
    }
}

/// A freshly built value together with its reported byte cost.
pub struct CostedValue<V> {
    /// The built value.
    pub value: V,
    /// Reported size in bytes; clamped to at least 1 when accounted.
    pub size: u64,
}

impl<V> CostedValue<V> {
    /// Creates a costed value.
    #[must_use]
    pub fn new(value: V, size: u64) -> Self {
        Self { value, size }
    }
}

/// Shared holder of one cached value, its lifecycle state, and its sizes.
pub(crate) struct Slot<V> {
    /// Construction lock: serializes builder invocations for this key.
    build_lock: Mutex<()>,
    /// The value; `None` until built, immutable once published.
    value: ArcSwapOption<V>,
    /// Lifecycle state ([`SlotState`] as `u8`).
    state: AtomicU8,
    /// Actual built size; 0 until construction succeeds.
    data_size: AtomicU64,
    /// The size charged against the cache budget; 0 until accredited.
    accounted_size: AtomicU64,
}

impl<V> Slot<V> {
    pub(crate) fn new() -> Self {
        Self {
            build_lock: Mutex::new(()),
            value: ArcSwapOption::empty(),
            state: AtomicU8::new(SlotState::Empty as u8),
            data_size: AtomicU64::new(0),
            accounted_size: AtomicU64::new(0),
        }
    }

    pub(crate) fn state(&self) -> SlotState {
        SlotState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn data_size(&self) -> u64 {
        self.data_size.load(Ordering::Acquire)
    }

    pub(crate) fn accounted_size(&self) -> u64 {
        self.accounted_size.load(Ordering::Acquire)
    }

    /// Returns the published value.
    ///
    /// Callers must have observed a built state first; the value is stored
    /// before the state flips, so the load cannot miss.
    pub(crate) fn published_value(&self) -> Arc<V> {
        self.value
            .load_full()
            .unwrap_or_else(|| unreachable!("built slot has no published value"))
    }

    /// Returns the value, building it if necessary.
    ///
    /// The boolean is `true` for the single caller whose invocation performed
    /// the build (the "winner"); that caller is responsible for accrediting
    /// the size afterwards. The builder runs under this slot's construction
    /// lock only — never under the cache's structural lock — and executes at
    /// most once per successful construction.
    ///
    /// On builder failure the slot records [`SlotState::BuildFailed`], stays
    /// retryable, and the error propagates to the triggering caller.
    pub(crate) fn materialize<F, E>(&self, build: F) -> Result<(Arc<V>, bool), E>
    where
        F: FnOnce() -> Result<CostedValue<V>, E>,
    {
        // Fast path: already built, read lock-free.
        if self.state().is_built() {
            return Ok((self.published_value(), false));
        }

        let _guard = self.build_lock.lock();

        // Re-check: another caller may have finished the build while we
        // waited for the construction lock.
        if self.data_size.load(Ordering::Acquire) != 0 {
            return Ok((self.published_value(), false));
        }

        match build() {
            Ok(built) => {
                let size = built.size.max(1);
                let value = Arc::new(built.value);
                self.value.store(Some(Arc::clone(&value)));
                self.data_size.store(size, Ordering::Release);
                self.state
                    .store(SlotState::BuiltUnaccounted as u8, Ordering::Release);
                Ok((value, true))
            }
            Err(err) => {
                self.value.store(None);
                self.state
                    .store(SlotState::BuildFailed as u8, Ordering::Release);
                Err(err)
            }
        }
    }

    /// Charges this slot's built size and advances to [`SlotState::Accounted`].
    ///
    /// Must be called by the construction winner while holding the cache's
    /// structural lock, and only after verifying the slot is still the one
    /// mapped under its key. Returns the size to add to the running total.
    pub(crate) fn accredit(&self) -> u64 {
        let size = self.data_size();
        debug_assert!(size > 0, "accrediting an unbuilt slot");
        debug_assert_eq!(
            self.accounted_size.load(Ordering::Acquire),
            0,
            "slot accredited twice"
        );
        self.accounted_size.store(size, Ordering::Release);
        self.state.store(SlotState::Accounted as u8, Ordering::Release);
        size
    }
}
