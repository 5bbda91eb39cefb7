use pulse_collector::Collector;
use pulse_common::{Metric, MetricValue};
use std::collections::BTreeMap;

/// Values sampled since the last report.
///
/// Samples merge the way the server merges them: gauges keep the latest
/// reading, counters add up. [`take`](SampleBuffer::take) empties the buffer,
/// so each counter increment is reported exactly once.
#[derive(Debug, Default)]
pub struct SampleBuffer {
    values: BTreeMap<String, MetricValue>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metrics: impl IntoIterator<Item = Metric>) {
        for metric in metrics {
            let merged = MetricValue::merge(self.values.get(&metric.id).copied(), metric.value);
            self.values.insert(metric.id, merged);
        }
    }

    /// Drains the buffer, ordered by id.
    pub fn take(&mut self) -> Vec<Metric> {
        std::mem::take(&mut self.values)
            .into_iter()
            .map(|(id, value)| Metric::new(id, value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Runs every collector once. A failing collector is logged and skipped.
pub fn collect_all(collectors: &mut [Box<dyn Collector>]) -> Vec<Metric> {
    let mut metrics = Vec::new();
    for collector in collectors.iter_mut() {
        match collector.collect() {
            Ok(sampled) => metrics.extend(sampled),
            Err(e) => tracing::warn!(collector = collector.name(), error = %e, "Collection failed"),
        }
    }
    metrics
}
