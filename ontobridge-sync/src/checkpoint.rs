//! Durable progress records for resumable runs.
//!
//! A checkpoint is a single count: the number of top-level entities
//! synchronized so far, including the run's starting offset.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Where a run records its progress on pause or abort.
#[async_trait]
pub trait CheckpointSink: Send + Sync {
    async fn save(&self, processed: u64) -> SyncResult<()>;

    /// The last saved count, if any.
    async fn load(&self) -> SyncResult<Option<u64>>;
}

/// Writes the count as decimal text, nothing else, to a file.
#[derive(Debug, Clone)]
pub struct FileCheckpoint {
    path: PathBuf,
}

impl FileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointSink for FileCheckpoint {
    async fn save(&self, processed: u64) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, processed.to_string()).await?;
        info!("Checkpoint {} written to {}", processed, self.path.display());
        Ok(())
    }

    async fn load(&self) -> SyncResult<Option<u64>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        text.trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| SyncError::InvalidCheckpoint(text))
    }
}

/// Keeps the count in memory. Clones share the value.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpoint {
    value: Arc<Mutex<Option<u64>>>,
}

impl MemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Option<u64> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CheckpointSink for MemoryCheckpoint {
    async fn save(&self, processed: u64) -> SyncResult<()> {
        *self.value.lock().unwrap_or_else(PoisonError::into_inner) = Some(processed);
        Ok(())
    }

    async fn load(&self) -> SyncResult<Option<u64>> {
        Ok(self.saved())
    }
}
