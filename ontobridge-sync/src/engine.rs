//! Sync engine: pushes converted entities to the remote store.
//!
//! Entities are sent in batches of top-level cache entries, each entry
//! together with the entities encapsulated under it. Entities the store
//! already knows are sent as update-replace statements linked to their
//! storage key; everything else is created.

use crate::checkpoint::CheckpointSink;
use crate::error::{SyncError, SyncResult};
use crate::signal::{SignalState, SyncSignal};
use crate::store::{RemoteStore, StoreStatus};
use indexmap::IndexMap;
use ontobridge_model::{wire, Entity, EntityCache};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default number of top-level entities per batch.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default maximum number of identifiers per find request.
pub const DEFAULT_MAX_FIND_SIZE: usize = 500;

/// Predicate linking an updated entity to its remote storage key.
pub const STORAGE_KEY_PREDICATE: &str = "http://orange-labs.fr/fog/ont/iot.owl#uuid";

/// Configuration for the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Top-level entities per batch.
    pub batch_size: usize,
    /// Maximum identifiers probed by one find request.
    pub max_find_size: usize,
    /// Sleep after a gateway-timeout write status (seconds).
    pub timeout_backoff_secs: u64,
    /// Predicate of the ownership statement prepended to updates.
    pub storage_key_predicate: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_find_size: DEFAULT_MAX_FIND_SIZE,
            timeout_backoff_secs: 30,
            storage_key_predicate: STORAGE_KEY_PREDICATE.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn timeout_backoff(&self) -> Duration {
        Duration::from_secs(self.timeout_backoff_secs)
    }

    fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".to_string()));
        }
        if self.max_find_size == 0 {
            return Err(SyncError::Config("max_find_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// How existing remote records are probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// One find request per entity.
    PerEntity,
    /// Paginated multi-identifier find requests per batch.
    #[default]
    Batched,
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-entity" => Ok(Self::PerEntity),
            "batched" => Ok(Self::Batched),
            other => Err(format!("unknown sync mode {other:?}, expected \"per-entity\" or \"batched\"")),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerEntity => "per-entity",
            Self::Batched => "batched",
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncOutcome {
    #[default]
    Completed,
    /// Paused at a batch boundary; `checkpoint` was recorded.
    Paused { checkpoint: u64 },
    /// Stopped at a batch boundary.
    Stopped,
}

/// Summary of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Top-level entities whose batch was flushed, not counting the starting offset.
    pub entities_synced: u64,
    /// Entities routed to creation.
    pub created: usize,
    /// Entities routed to update.
    pub updated: usize,
    /// Completed flush cycles.
    pub flushes: usize,
    /// Find requests issued.
    pub find_calls: usize,
    pub outcome: SyncOutcome,
}

/// Creation and update statement buffers of the current batch.
#[derive(Debug, Default)]
struct Buffers {
    create: String,
    update: String,
}

/// Synchronizes entity batches with a [`RemoteStore`].
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    config: SyncConfig,
    checkpoint: Arc<dyn CheckpointSink>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        config: SyncConfig,
        checkpoint: Arc<dyn CheckpointSink>,
    ) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            checkpoint,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronizes `roots` (top-level cache entries) in batches.
    ///
    /// `begin_index` is the number of top-level entries already synchronized
    /// by earlier runs; it is added to every recorded checkpoint.
    pub async fn run(
        &self,
        mode: SyncMode,
        roots: &[&Entity],
        begin_index: u64,
        signal: &SyncSignal,
    ) -> SyncResult<SyncReport> {
        info!(
            "Synchronizing {} top-level entities ({} mode, offset {})",
            roots.len(),
            mode,
            begin_index
        );
        let report = match mode {
            SyncMode::PerEntity => self.sync_per_entity(roots, begin_index, signal).await?,
            SyncMode::Batched => self.sync_batched(roots, begin_index, signal).await?,
        };
        info!(
            "Sync finished: {:?}, {} synchronized, {} created, {} updated",
            report.outcome, report.entities_synced, report.created, report.updated
        );
        Ok(report)
    }

    /// One find request per entity, flushing every `batch_size` top-level entries.
    pub async fn sync_per_entity(
        &self,
        roots: &[&Entity],
        begin_index: u64,
        signal: &SyncSignal,
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        for batch in roots.chunks(self.config.batch_size) {
            if let Some(outcome) = self.poll_signal(signal, begin_index + report.entities_synced).await? {
                report.outcome = outcome;
                return Ok(report);
            }

            let mut buffers = Buffers::default();
            for entity in batch.iter().flat_map(|root| EntityCache::flatten_entity(root)) {
                let found = match self.store.find_by_identifier(&entity.identifier).await {
                    Ok(found) => found,
                    Err(e) => return Err(self.abort(begin_index + report.entities_synced, e).await),
                };
                report.find_calls += 1;

                match found.items.first() {
                    Some(record) => {
                        self.push_update(&mut buffers, entity, &record.storage_key);
                        report.updated += 1;
                    }
                    None => {
                        buffers.create.push_str(&entity.statements);
                        report.created += 1;
                    }
                }
            }

            if let Err(e) = self.flush(&mut buffers, &mut report).await {
                return Err(self.abort(begin_index + report.entities_synced, e).await);
            }
            report.entities_synced += batch.len() as u64;
        }

        report.outcome = SyncOutcome::Completed;
        Ok(report)
    }

    /// Multi-identifier probes per batch, paginated by `max_find_size`.
    pub async fn sync_batched(
        &self,
        roots: &[&Entity],
        begin_index: u64,
        signal: &SyncSignal,
    ) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();

        for batch in roots.chunks(self.config.batch_size) {
            if let Some(outcome) = self.poll_signal(signal, begin_index + report.entities_synced).await? {
                report.outcome = outcome;
                return Ok(report);
            }

            // Duplicate identifiers keep their first position and last statements.
            let mut entities: IndexMap<&str, &Entity> = IndexMap::new();
            for entity in batch.iter().flat_map(|root| EntityCache::flatten_entity(root)) {
                entities.insert(entity.identifier.as_str(), entity);
            }

            let storage_keys = match self.probe(&entities, &mut report).await {
                Ok(keys) => keys,
                Err(e) => return Err(self.abort(begin_index + report.entities_synced, e).await),
            };

            let mut buffers = Buffers::default();
            for (identifier, entity) in &entities {
                match storage_keys.get(*identifier) {
                    Some(key) => {
                        self.push_update(&mut buffers, entity, key);
                        report.updated += 1;
                    }
                    None => {
                        buffers.create.push_str(&entity.statements);
                        report.created += 1;
                    }
                }
            }

            if let Err(e) = self.flush(&mut buffers, &mut report).await {
                return Err(self.abort(begin_index + report.entities_synced, e).await);
            }
            report.entities_synced += batch.len() as u64;
        }

        report.outcome = SyncOutcome::Completed;
        Ok(report)
    }

    /// Deletes every record of the store's namespace. Returns the number of
    /// storage keys deleted.
    pub async fn clear_namespace(&self) -> SyncResult<usize> {
        let page_size = self.config.max_find_size;
        let mut pending: Vec<String> = Vec::new();
        let mut deleted = 0;

        loop {
            let page = self.store.find_in_namespace(page_size, 0).await?;
            let page_len = page.items.len();
            for record in page.items {
                debug!("delete : {}", record.identifier);
                pending.push(record.storage_key);
                if pending.len() == page_size {
                    deleted += self.delete(&mut pending).await?;
                }
            }
            if page_len < page_size {
                break;
            }
        }
        if !pending.is_empty() {
            deleted += self.delete(&mut pending).await?;
        }

        info!("Cleared {} records from the namespace", deleted);
        Ok(deleted)
    }

    /// Probes every identifier of the batch in pages of `max_find_size`.
    /// Returns identifier → storage key for the ones already persisted.
    async fn probe(
        &self,
        entities: &IndexMap<&str, &Entity>,
        report: &mut SyncReport,
    ) -> SyncResult<HashMap<String, String>> {
        let identifiers: Vec<String> = entities.keys().map(|id| id.to_string()).collect();
        let mut storage_keys = HashMap::new();

        for page in identifiers.chunks(self.config.max_find_size) {
            let found = self
                .store
                .find_by_identifiers(page, self.config.max_find_size)
                .await?;
            report.find_calls += 1;
            debug!("Probed {} identifiers, {} already persisted", page.len(), found.items.len());

            for record in found.items {
                if entities.contains_key(record.identifier.as_str()) {
                    storage_keys.insert(record.identifier, record.storage_key);
                }
            }
        }
        Ok(storage_keys)
    }

    fn push_update(&self, buffers: &mut Buffers, entity: &Entity, storage_key: &str) {
        buffers.update.push_str(&wire::data_statement(
            &entity.identifier,
            &self.config.storage_key_predicate,
            &wire::literal(storage_key, "xsd:string"),
        ));
        buffers.update.push_str(&entity.statements);
    }

    /// Sends the non-empty buffers, creation first.
    async fn flush(&self, buffers: &mut Buffers, report: &mut SyncReport) -> SyncResult<()> {
        if !buffers.create.is_empty() {
            let body = format!("{}{}", wire::PREFIX_DECLARATION, std::mem::take(&mut buffers.create));
            let status = self.store.create_batch(&body).await?;
            self.handle_write_status("Insertion", status).await;
        }
        if !buffers.update.is_empty() {
            let body = format!("{}{}", wire::PREFIX_DECLARATION, std::mem::take(&mut buffers.update));
            let status = self.store.update_replace_batch(&body).await?;
            self.handle_write_status("Update", status).await;
        }
        report.flushes += 1;
        Ok(())
    }

    /// Failure statuses are logged, not fatal; a gateway timeout additionally
    /// backs off so the store can finish processing.
    async fn handle_write_status(&self, operation: &str, status: StoreStatus) {
        if status.is_success() {
            info!("{} successfully done", operation);
            return;
        }
        error!("{} failed ! : status: {}", operation, status);
        if status.is_gateway_timeout() {
            warn!(
                "Remote store timed out, sleeping {}s before continuing",
                self.config.timeout_backoff_secs
            );
            tokio::time::sleep(self.config.timeout_backoff()).await;
        }
    }

    async fn delete(&self, storage_keys: &mut Vec<String>) -> SyncResult<usize> {
        let status = self.store.delete_batch(storage_keys).await?;
        if !status.is_success() {
            return Err(SyncError::RemoteStatus {
                operation: "delete batch",
                status: status.code(),
            });
        }
        let count = storage_keys.len();
        storage_keys.clear();
        Ok(count)
    }

    async fn poll_signal(&self, signal: &SyncSignal, checkpoint: u64) -> SyncResult<Option<SyncOutcome>> {
        match signal.state() {
            SignalState::Running => Ok(None),
            SignalState::Paused => {
                info!("Pause requested, recording checkpoint {}", checkpoint);
                self.checkpoint.save(checkpoint).await?;
                Ok(Some(SyncOutcome::Paused { checkpoint }))
            }
            SignalState::Stopped => {
                info!("Stop requested after {} top-level entities", checkpoint);
                Ok(Some(SyncOutcome::Stopped))
            }
        }
    }

    /// Records `checkpoint` and wraps the failure.
    async fn abort(&self, checkpoint: u64, source: SyncError) -> SyncError {
        error!("Sync aborted: {}; recording checkpoint {}", source, checkpoint);
        if let Err(e) = self.checkpoint.save(checkpoint).await {
            error!("Failed to record checkpoint {}: {}", checkpoint, e);
        }
        SyncError::Aborted {
            checkpoint,
            source: Box::new(source),
        }
    }
}
