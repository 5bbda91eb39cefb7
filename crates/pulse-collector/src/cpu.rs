use crate::Collector;
use anyhow::Result;
use pulse_common::Metric;
use sysinfo::System;

/// Per-core utilization as `CPUutilization1..=N`.
///
/// The core count is only known at runtime, so this is the one collector
/// that does not use a static field table.
pub struct CpuCollector {
    system: System,
}

impl CpuCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        // usage is a delta between two refreshes; prime the first one
        system.refresh_cpu_usage();
        Self { system }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.system.refresh_cpu_usage();
        Ok(self
            .system
            .cpus()
            .iter()
            .enumerate()
            .map(|(i, cpu)| {
                Metric::gauge(format!("CPUutilization{}", i + 1), f64::from(cpu.cpu_usage()))
            })
            .collect())
    }
}
