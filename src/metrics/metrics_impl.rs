use crate::metrics::traits::PoolMetricsRecorder;

#[derive(Debug, Default, Clone)]
pub struct PoolMetrics {
    pub put_calls: u64,
    pub get_calls: u64,
    pub exact_hits: u64,
    pub best_fit_hits: u64,
    pub misses: u64,
    pub remove_last_calls: u64,
    pub evicted: u64,
}

impl PoolMetrics {
    pub fn new() -> PoolMetrics {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl PoolMetricsRecorder for PoolMetrics {
    fn record_put(&mut self) {
        self.put_calls += 1;
    }

    fn record_get_call(&mut self) {
        self.get_calls += 1;
    }

    fn record_exact_hit(&mut self) {
        self.exact_hits += 1;
    }

    fn record_best_fit_hit(&mut self) {
        self.best_fit_hits += 1;
    }

    fn record_miss(&mut self) {
        self.misses += 1;
    }

    fn record_remove_last_call(&mut self) {
        self.remove_last_calls += 1;
    }

    fn record_evicted(&mut self) {
        self.evicted += 1;
    }
}
