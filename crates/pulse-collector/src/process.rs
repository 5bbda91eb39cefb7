use crate::{sample_table, Collector, Field};
use anyhow::{anyhow, Result};
use pulse_common::Metric;
use sysinfo::{Pid, Process, ProcessRefreshKind, ProcessesToUpdate, System};

/// Resource usage of the agent process itself.
pub struct ProcessCollector {
    system: System,
    pid: Option<Pid>,
}

const FIELDS: &[Field<Process>] = &[
    Field::gauge("ResidentMemory", |p: &Process| p.memory().into()),
    Field::gauge("VirtualMemory", |p: &Process| p.virtual_memory().into()),
    Field::gauge("ProcessCPU", |p: &Process| f64::from(p.cpu_usage()).into()),
    Field::gauge("ReadBytes", |p: &Process| p.disk_usage().total_read_bytes.into()),
    Field::gauge("WrittenBytes", |p: &Process| {
        p.disk_usage().total_written_bytes.into()
    }),
    Field::gauge("Uptime", |p: &Process| p.run_time().into()),
];

impl ProcessCollector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }
}

impl Default for ProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for ProcessCollector {
    fn name(&self) -> &str {
        "process"
    }

    fn collect(&mut self) -> Result<Vec<Metric>> {
        let pid = self
            .pid
            .ok_or_else(|| anyhow!("current process id is not available"))?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        let process = self
            .system
            .process(pid)
            .ok_or_else(|| anyhow!("process {pid} not found"))?;
        sample_table(FIELDS, process)
    }
}
