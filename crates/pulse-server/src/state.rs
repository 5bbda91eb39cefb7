use pulse_common::Signer;
use pulse_storage::{Repository, SnapshotFile, StorageError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn Repository>,
    pub signer: Signer,
    /// Set when every accepted update must be followed by a snapshot write.
    pub sync_snapshot: Option<Arc<SnapshotFile>>,
}

impl AppState {
    pub fn new(repository: Arc<dyn Repository>, signer: Signer) -> Self {
        Self {
            repository,
            signer,
            sync_snapshot: None,
        }
    }

    pub fn with_sync_snapshot(mut self, snapshot: Arc<SnapshotFile>) -> Self {
        self.sync_snapshot = Some(snapshot);
        self
    }

    /// Runs after a write has been applied to the repository.
    pub async fn committed(&self) -> Result<(), StorageError> {
        if let Some(snapshot) = &self.sync_snapshot {
            snapshot.persist_from(self.repository.as_ref()).await?;
        }
        Ok(())
    }
}
