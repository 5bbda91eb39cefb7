//! Latest-value metric storage for the pulse server.
//!
//! [`Repository`] is the single piece of shared mutable state on the server.
//! Two backends implement it:
//!
//! - [`memory::MemoryRepository`]: a process-local map, made durable by
//!   periodically writing a [`snapshot::SnapshotFile`].
//! - [`database::DatabaseRepository`]: a relational `metrics` table accessed
//!   through a pooled SeaORM connection (SQLite or PostgreSQL).
//!
//! Both apply the same merge policy on write: counters accumulate, gauges
//! overwrite, and the stored hash always covers the stored value.

pub mod database;
pub mod entities;
pub mod error;
pub mod memory;
pub mod snapshot;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use pulse_common::{Metric, MetricValue, Signer};
use std::collections::HashMap;

pub use database::{DatabaseRepository, PoolOptions};
pub use error::{Result, StorageError};
pub use memory::MemoryRepository;
pub use snapshot::SnapshotFile;

/// Mapping from metric id to its current value.
pub type MetricMap = HashMap<String, Metric>;

/// Storage contract shared by every backend.
///
/// Implementations must be safe to share across request handlers
/// (`Send + Sync`). The read-modify-write behind counter accumulation is
/// atomic per id: concurrent puts never lose an update and readers never
/// see a half-applied merge.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Returns the stored metric for `id`.
    ///
    /// # Errors
    ///
    /// [`StorageError::NotFound`] when nothing is stored under `id`.
    async fn get(&self, id: &str) -> Result<Metric>;

    /// Upserts `metric` and returns what is now stored.
    ///
    /// A counter adds its delta to a stored counter; anything else replaces
    /// the stored entry. The stored hash is recomputed over the merged value.
    async fn put(&self, metric: Metric) -> Result<Metric>;

    /// Applies every metric in order as one atomic unit.
    async fn put_batch(&self, metrics: Vec<Metric>) -> Result<()>;

    /// Full copy of the current table.
    async fn all(&self) -> Result<MetricMap>;

    /// Discards every entry and replaces the table with `metrics`.
    ///
    /// Entries are stored under their own `id` and re-signed with the
    /// repository's key, whatever map key or hash they arrived with.
    async fn update_all(&self, metrics: MetricMap) -> Result<()>;

    /// Checks that the durable backing store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// Re-keys `metrics` by id and signs each entry with `signer`.
pub(crate) fn resigned(metrics: MetricMap, signer: &Signer) -> MetricMap {
    metrics
        .into_values()
        .map(|m| (m.id.clone(), signer.signed(m)))
        .collect()
}

/// Merges `incoming` into `existing` and re-signs the result.
pub(crate) fn merge(existing: Option<&Metric>, incoming: Metric, signer: &Signer) -> Metric {
    let value = MetricValue::merge(existing.map(|m| m.value), incoming.value);
    let hash = signer.sign(&incoming.id, &value);
    Metric {
        id: incoming.id,
        value,
        hash,
    }
}
