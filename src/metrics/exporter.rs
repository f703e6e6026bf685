use std::io::Write;
use std::sync::Mutex;

use crate::metrics::snapshot::PoolMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for pool metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// directly or forwarded to a collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<PoolMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &PoolMetricsSnapshot) {
        self.write_metric("counter", "put_calls_total", snapshot.put_calls);
        self.write_metric("counter", "get_calls_total", snapshot.get_calls);
        self.write_metric("counter", "exact_hits_total", snapshot.exact_hits);
        self.write_metric("counter", "best_fit_hits_total", snapshot.best_fit_hits);
        self.write_metric("counter", "misses_total", snapshot.misses);
        self.write_metric("counter", "remove_last_calls_total", snapshot.remove_last_calls);
        self.write_metric("counter", "evicted_total", snapshot.evicted);
        self.write_metric("gauge", "buffers", snapshot.buffers as u64);
        self.write_metric("gauge", "groups", snapshot.groups as u64);
        self.write_metric("gauge", "pooled_keys", snapshot.pooled_keys as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_counters_and_gauges_with_prefix() {
        let exporter = PrometheusTextExporter::new("bitmap_pool", Vec::new());
        let snapshot = PoolMetricsSnapshot {
            put_calls: 3,
            misses: 1,
            buffers: 2,
            ..PoolMetricsSnapshot::default()
        };
        exporter.export(&snapshot);

        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE bitmap_pool_put_calls_total counter\nbitmap_pool_put_calls_total 3\n"));
        assert!(text.contains("bitmap_pool_misses_total 1\n"));
        assert!(text.contains("# TYPE bitmap_pool_buffers gauge\nbitmap_pool_buffers 2\n"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&PoolMetricsSnapshot::default());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("\ngroups 0\n"));
    }
}
