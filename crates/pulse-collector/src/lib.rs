//! Metric sources sampled by the pulse agent.
//!
//! Each [`Collector`] owns one category of statistics and describes its
//! metrics with a static table of [`Field`]s (name, kind, sampler). The agent
//! calls every collector from [`registry`] once per poll tick and merges the
//! results into its report buffer.

pub mod cpu;
pub mod memory;
pub mod process;
pub mod random;

use anyhow::Result;
use pulse_common::{Metric, MetricKind, MetricValue, RawValue};

/// A metric source that runs on the agent host.
///
/// The trait requires `Send + Sync` so the collector set can move into the
/// agent's polling task.
pub trait Collector: Send + Sync {
    /// Short name (`"memory"`, `"cpu"`) used in log lines.
    fn name(&self) -> &str;

    /// Samples every metric this collector owns.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<Metric>>;
}

/// One statically declared metric: its name, its kind and how to read it
/// from the collector's refreshed state `S`.
pub struct Field<S> {
    pub name: &'static str,
    pub kind: MetricKind,
    pub sample: fn(&S) -> RawValue<'static>,
}

impl<S> Field<S> {
    pub const fn gauge(name: &'static str, sample: fn(&S) -> RawValue<'static>) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            sample,
        }
    }

    pub const fn counter(name: &'static str, sample: fn(&S) -> RawValue<'static>) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            sample,
        }
    }

    fn read(&self, state: &S) -> Result<Option<Metric>> {
        let value = MetricValue::parse(self.kind, (self.sample)(state))?;
        Ok(value.map(|v| Metric::new(self.name, v)))
    }
}

/// Reads every field of `table` from `state`.
pub fn sample_table<S>(table: &[Field<S>], state: &S) -> Result<Vec<Metric>> {
    let mut metrics = Vec::with_capacity(table.len());
    for field in table {
        if let Some(metric) = field.read(state)? {
            metrics.push(metric);
        }
    }
    Ok(metrics)
}

/// Counts polls: one increment per collect call.
pub struct PollCounter;

pub const POLL_COUNT: &str = "PollCount";

impl Collector for PollCounter {
    fn name(&self) -> &str {
        "poll"
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        Ok(vec![Metric::counter(POLL_COUNT, 1)])
    }
}

/// Every collector the agent runs, in sampling order.
pub fn registry() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(process::ProcessCollector::new()),
        Box::new(memory::MemoryCollector::new()),
        Box::new(cpu::CpuCollector::new()),
        Box::new(random::RandomCollector),
        Box::new(PollCounter),
    ]
}
