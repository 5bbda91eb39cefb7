use crate::Collector;
use anyhow::Result;
use pulse_common::Metric;

/// `RandomValue` gauge in `[0, 1)`, fresh on every poll.
pub struct RandomCollector;

impl Collector for RandomCollector {
    fn name(&self) -> &str {
        "random"
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        Ok(vec![Metric::gauge("RandomValue", rand::random::<f64>())])
    }
}
