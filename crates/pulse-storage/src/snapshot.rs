use crate::error::Result;
use crate::{MetricMap, Repository};
use pulse_common::Metric;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// JSON snapshot of the whole metric table: an object keyed by metric id.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never observes a partially written snapshot. Concurrent writers
/// are serialized.
pub struct SnapshotFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot, keyed by each entry's own id. A missing or empty
    /// file reads as an empty table.
    pub async fn read(&self) -> Result<MetricMap> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MetricMap::new()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(MetricMap::new());
        }
        let parsed: BTreeMap<String, Metric> = serde_json::from_slice(&bytes)?;
        let mut metrics = MetricMap::with_capacity(parsed.len());
        for (key, metric) in parsed {
            if key != metric.id {
                tracing::warn!(key = %key, id = %metric.id, "Snapshot key differs from metric id");
            }
            metrics.insert(metric.id.clone(), metric);
        }
        Ok(metrics)
    }

    /// Replaces the file with `metrics`, keys sorted for stable output.
    pub async fn write(&self, metrics: &MetricMap) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_locked(metrics).await
    }

    /// Caller holds `write_lock`.
    async fn write_locked(&self, metrics: &MetricMap) -> Result<()> {
        let ordered: BTreeMap<&str, &Metric> =
            metrics.iter().map(|(id, m)| (id.as_str(), m)).collect();
        let body = serde_json::to_vec_pretty(&ordered)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Replaces the repository contents with the snapshot. Returns how many
    /// metrics were loaded.
    pub async fn restore_into(&self, repository: &dyn Repository) -> Result<usize> {
        let metrics = self.read().await?;
        let count = metrics.len();
        repository.update_all(metrics).await?;
        tracing::info!(path = %self.path.display(), count, "Restored metrics from snapshot");
        Ok(count)
    }

    /// Writes the repository's current contents. Returns how many metrics
    /// were persisted.
    ///
    /// The table is read under the write lock, so files land in the order
    /// the table was read.
    pub async fn persist_from(&self, repository: &dyn Repository) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let metrics = repository.all().await?;
        self.write_locked(&metrics).await?;
        tracing::debug!(path = %self.path.display(), count = metrics.len(), "Wrote snapshot");
        Ok(metrics.len())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
