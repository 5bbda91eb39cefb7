use pulse_storage::{Repository, SnapshotFile};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Periodically writes the whole repository to the snapshot file.
pub struct SnapshotScheduler {
    repository: Arc<dyn Repository>,
    file: Arc<SnapshotFile>,
    interval_secs: u64,
}

impl SnapshotScheduler {
    pub fn new(repository: Arc<dyn Repository>, file: Arc<SnapshotFile>, interval_secs: u64) -> Self {
        Self {
            repository,
            file,
            interval_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.interval_secs,
            path = %self.file.path().display(),
            "Snapshot scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_secs.max(1)));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        tick.tick().await;
        loop {
            tick.tick().await;
            self.write_once().await;
        }
    }

    /// One snapshot write; failures are logged and the next tick retries.
    pub async fn write_once(&self) {
        match self.file.persist_from(self.repository.as_ref()).await {
            Ok(count) => tracing::debug!(count, "Snapshot written"),
            Err(e) => tracing::error!(error = %e, "Snapshot write failed"),
        }
    }
}
