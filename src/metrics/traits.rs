//! # Metrics Traits
//!
//! Recorders only write counters; providers only read/snapshot; exporters
//! only publish. Keeping them apart lets the strategy record cheaply on the
//! hot path while benches and monitoring consume snapshots on their own
//! schedule.
//!
//! ```text
//!   SizeFormatStrategy ──record_*──► PoolMetrics
//!                                        │
//!                         MetricsSnapshotProvider::snapshot()
//!                                        ▼
//!                               PoolMetricsSnapshot ──► MetricsExporter
//! ```

/// Counters written by pool strategies.
pub trait PoolMetricsRecorder {
    fn record_put(&mut self);
    /// Every `get`, including ones rejected before a lookup.
    fn record_get_call(&mut self);
    /// A lookup served from the group of exactly the requested footprint and format.
    fn record_exact_hit(&mut self);
    /// A lookup served from a larger or differently tagged compatible group.
    fn record_best_fit_hit(&mut self);
    fn record_miss(&mut self);
    fn record_remove_last_call(&mut self);
    fn record_evicted(&mut self);
}

/// Produces a point-in-time copy of a component's metrics.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publishes snapshots to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
