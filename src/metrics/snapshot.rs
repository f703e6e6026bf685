#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetricsSnapshot {
    pub put_calls: u64,

    pub get_calls: u64,
    pub exact_hits: u64,
    pub best_fit_hits: u64,
    pub misses: u64,

    pub remove_last_calls: u64,
    pub evicted: u64,

    // gauges captured at snapshot time
    pub buffers: usize,
    pub groups: usize,
    pub pooled_keys: usize,
}

impl PoolMetricsSnapshot {
    /// Fraction of `get` calls that returned a buffer, rejected requests
    /// included; 0.0 before any call.
    pub fn hit_rate(&self) -> f64 {
        if self.get_calls == 0 {
            return 0.0;
        }
        (self.exact_hits + self.best_fit_hits) as f64 / self.get_calls as f64
    }
}
