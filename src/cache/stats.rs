/// Cache statistics for monitoring
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a fresh entry
    pub hits: u64,
    /// Requests with no usable entry
    pub misses: u64,
    /// Stale entries confirmed by a `304 Not Modified`
    pub revalidated: u64,
    /// Requests that reached the network
    pub network_calls: u64,
    /// Failed cache reads or writes
    pub store_errors: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> u32 {
        let served = self.hits + self.revalidated;
        let total = served + self.misses;
        if total > 0 {
            (served as f32 / total as f32 * 100.0) as u32
        } else {
            0
        }
    }

    /// Log cache statistics
    pub fn log(&self) {
        tracing::info!(
            hits = self.hits,
            misses = self.misses,
            revalidated = self.revalidated,
            network_calls = self.network_calls,
            store_errors = self.store_errors,
            hit_rate = self.hit_rate(),
            "Response cache statistics"
        );
    }
}
