//! Cache statistics for monitoring.

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Lookups that found an existing entry.
    pub hits: u64,
    /// Lookups that created a new entry.
    pub misses: u64,
    /// Successful builder invocations.
    pub builds: u64,
    /// Failed builder invocations.
    pub build_failures: u64,
    /// Entries reclaimed by the eviction scan.
    pub evictions: u64,
    /// Entries currently mapped.
    pub entries: usize,
    /// Accounted bytes currently charged against the budget.
    pub bytes: u64,
}

impl CacheStats {
    /// Calculate hit rate (0.0 to 1.0).
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
