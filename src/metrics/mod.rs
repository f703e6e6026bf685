//! Pool metrics, compiled only with the `metrics` feature.
//!
//! Recording, snapshotting and exporting are separate concerns:
//!
//! - [`traits::PoolMetricsRecorder`]: written by the strategy on each call.
//! - [`traits::MetricsSnapshotProvider`]: copies counters plus gauges out.
//! - [`traits::MetricsExporter`]: publishes a snapshot (e.g.
//!   [`exporter::PrometheusTextExporter`]).

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
