use crate::error::{Result, StorageError};
use crate::{merge, resigned, MetricMap, Repository};
use async_trait::async_trait;
use pulse_common::{Metric, Signer};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Process-local repository guarded by a single `RwLock`.
///
/// Every write holds the lock for the whole merge, so counter accumulation
/// is atomic; reads share the lock and proceed in parallel.
pub struct MemoryRepository {
    metrics: RwLock<MetricMap>,
    signer: Signer,
}

impl MemoryRepository {
    pub fn new(signer: Signer) -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            signer,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MetricMap> {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MetricMap> {
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn put_locked(&self, metrics: &mut MetricMap, metric: Metric) -> Metric {
        let merged = merge(metrics.get(&metric.id), metric, &self.signer);
        metrics.insert(merged.id.clone(), merged.clone());
        merged
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn get(&self, id: &str) -> Result<Metric> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn put(&self, metric: Metric) -> Result<Metric> {
        let mut metrics = self.write();
        Ok(self.put_locked(&mut metrics, metric))
    }

    async fn put_batch(&self, batch: Vec<Metric>) -> Result<()> {
        let mut metrics = self.write();
        for metric in batch {
            self.put_locked(&mut metrics, metric);
        }
        Ok(())
    }

    async fn all(&self) -> Result<MetricMap> {
        Ok(self.read().clone())
    }

    async fn update_all(&self, replacement: MetricMap) -> Result<()> {
        let replacement = resigned(replacement, &self.signer);
        *self.write() = replacement;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Err(StorageError::Unavailable(
            "no database configured".to_string(),
        ))
    }
}
