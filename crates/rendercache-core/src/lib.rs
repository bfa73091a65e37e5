//! # `RenderCache` Core
//!
//! Thread-safe, size-bounded memoization cache for derived graphics artifacts.
//!
//! A graphics runtime repeatedly derives expensive artifacts from cheap keys:
//! compiled shaders from source hashes, pipeline layouts from descriptor
//! signatures, descriptor sets from binding tuples. `RenderCache` memoizes
//! those derivations behind a single operation, [`MemoCache::get_or_build`],
//! with approximate-LRU eviction once the accounted byte total exceeds the
//! configured budget.
//!
//! ## Design
//!
//! - **Builders run unlocked**: the cache-wide structural mutex is held only
//!   for O(1) bookkeeping. Slow value construction happens under a per-entry
//!   construction mutex, so independent keys build fully in parallel.
//! - **At-most-once construction**: concurrent calls for the same key invoke
//!   the builder once; losers block on the entry's construction mutex and
//!   receive the winner's value.
//! - **Eviction never invalidates a caller**: values are handed out as
//!   [`Arc<V>`](std::sync::Arc) and stay alive after the entry is evicted.
//!
//! ## Quick Start
//!
//! ```
//! use rendercache_core::{CostedValue, MemoCache};
//!
//! # fn main() -> Result<(), std::convert::Infallible> {
//! let cache: MemoCache<String, Vec<u8>> = MemoCache::new(32 * 1024);
//!
//! // Builder runs only on a miss; its reported size is charged to the budget.
//! let blob = cache.get_or_build("shader:main_ps".to_string(), || {
//!     Ok::<_, std::convert::Infallible>(CostedValue::new(vec![0u8; 1024], 1024))
//! })?;
//!
//! assert_eq!(blob.len(), 1024);
//! assert_eq!(cache.curr_size(), 1024);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // Acceptable for hit-rate calculation
#![allow(clippy::cast_possible_truncation)] // usize <-> u64 counters
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::uninlined_format_args)]

pub mod cache;
pub mod config;
pub mod error;
#[cfg(test)]
mod error_tests;

pub use cache::{CacheStats, CostedValue, MemoCache};
pub use config::{CacheConfig, ConfigError};
pub use error::{Error, Result};
