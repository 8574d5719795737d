//! Incremental synchronization of converted entities with a remote triple-store.
//!
//! Takes the top-level entries of an already reconciled
//! [`EntityCache`](ontobridge_model::EntityCache) and sends them to a
//! [`RemoteStore`] in batches:
//! - per-entity mode probes the store once per entity
//! - batched mode probes a whole batch with paginated multi-identifier finds
//!
//! A [`SyncSignal`] is polled between batches; pausing records a checkpoint
//! through a [`CheckpointSink`] so a later run can resume from that offset.

pub mod checkpoint;
pub mod engine;
pub mod error;
pub mod http;
pub mod signal;
pub mod store;

pub use checkpoint::{CheckpointSink, FileCheckpoint, MemoryCheckpoint};
pub use engine::{SyncConfig, SyncEngine, SyncMode, SyncOutcome, SyncReport};
pub use error::{SyncError, SyncResult};
pub use http::{HttpStoreClient, HttpStoreConfig};
pub use signal::{SignalState, SyncSignal};
pub use store::{FindResult, RemoteRecord, RemoteStore, StoreStatus};
