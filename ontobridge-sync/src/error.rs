//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP client error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote store answered a request that must succeed with a failure status.
    #[error("remote store returned status {status} for {operation}")]
    RemoteStatus { operation: &'static str, status: u16 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Checkpoint I/O error.
    #[error("checkpoint error: {0}")]
    Io(#[from] std::io::Error),

    /// A checkpoint artifact does not hold a progress count.
    #[error("invalid checkpoint content: {0:?}")]
    InvalidCheckpoint(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A request failed mid-run; progress up to `checkpoint` has been recorded.
    #[error("sync aborted at checkpoint {checkpoint}: {source}")]
    Aborted {
        checkpoint: u64,
        #[source]
        source: Box<SyncError>,
    },
}

impl SyncError {
    /// The recorded checkpoint, if this error aborted a run.
    pub fn checkpoint(&self) -> Option<u64> {
        match self {
            Self::Aborted { checkpoint, .. } => Some(*checkpoint),
            _ => None,
        }
    }

    /// Returns true if this error indicates the remote store timed out.
    pub fn is_gateway_timeout(&self) -> bool {
        match self {
            Self::RemoteStatus { status, .. } => *status == 504,
            Self::Http(e) => e.is_timeout(),
            Self::Aborted { source, .. } => source.is_gateway_timeout(),
            _ => false,
        }
    }
}
