use crate::{sample_table, Collector, Field};
use anyhow::Result;
use pulse_common::Metric;
use sysinfo::System;

pub struct MemoryCollector {
    system: System,
}

const FIELDS: &[Field<System>] = &[
    Field::gauge("TotalMemory", |s: &System| s.total_memory().into()),
    Field::gauge("FreeMemory", |s: &System| s.free_memory().into()),
    Field::gauge("AvailableMemory", |s: &System| s.available_memory().into()),
    Field::gauge("UsedMemory", |s: &System| s.used_memory().into()),
    Field::gauge("TotalSwap", |s: &System| s.total_swap().into()),
    Field::gauge("UsedSwap", |s: &System| s.used_swap().into()),
];

impl MemoryCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for MemoryCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MemoryCollector {
    fn name(&self) -> &str {
        "memory"
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        self.system.refresh_memory();
        sample_table(FIELDS, &self.system)
    }
}
