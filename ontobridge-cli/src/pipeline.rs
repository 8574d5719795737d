//! Load, convert, and synchronize.

use anyhow::{Context, Result};
use ontobridge_convert::Converter;
use ontobridge_model::{wire, Entity, EntityCache, MappingSpec};
use ontobridge_sync::{
    CheckpointSink, FileCheckpoint, MemoryCheckpoint, RemoteStore, SyncEngine, SyncMode,
    SyncReport, SyncSignal,
};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;

/// Options of one sync invocation.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mode: SyncMode,
    /// Top-level entities to skip, already synchronized by an earlier run.
    pub begin_index: u64,
    /// Read the begin index from the checkpoint file instead.
    pub resume: bool,
    pub checkpoint: PathBuf,
}

pub fn load_mapping(path: &Path) -> Result<MappingSpec> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read mapping file {}", path.display()))?;
    MappingSpec::from_json_str(&text).with_context(|| format!("invalid mapping file {}", path.display()))
}

pub fn load_source(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    parse_source(&text).with_context(|| format!("source file {} is not valid JSON", path.display()))
}

/// Parses source records without serde_json's nesting limit; deep recursive
/// records are bounded by the converter's `max_depth` instead.
pub fn parse_source(text: &str) -> serde_json::Result<Value> {
    let mut json = serde_json::Deserializer::from_str(text);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}

/// Runs one full reconciliation pass.
pub fn convert(config: &AppConfig, spec: MappingSpec, source: &Value) -> Result<Converter> {
    let mut converter = Converter::new(spec, config.convert.clone());
    converter.parse(source).context("transformation failed")?;
    Ok(converter)
}

/// Statement text of the whole cache in sync order, headed by the prefix declaration.
pub fn render(cache: &EntityCache) -> String {
    let mut out = String::from(wire::PREFIX_DECLARATION);
    for entity in cache.flatten() {
        out.push_str(&entity.statements);
    }
    out
}

/// Top-level entries from `begin_index` on.
pub fn roots_from(cache: &EntityCache, begin_index: u64) -> Vec<&Entity> {
    let skip = usize::try_from(begin_index).unwrap_or(usize::MAX);
    cache.iter().skip(skip).collect()
}

/// Resolves the begin index, honoring `--resume`.
pub async fn begin_index(options: &SyncOptions) -> Result<u64> {
    if !options.resume {
        return Ok(options.begin_index);
    }
    let checkpoint = FileCheckpoint::new(&options.checkpoint);
    let saved = checkpoint
        .load()
        .await
        .with_context(|| format!("failed to read checkpoint {}", options.checkpoint.display()))?;
    match saved {
        Some(index) => {
            info!("Resuming from checkpoint {}", index);
            Ok(index)
        }
        None => {
            info!("No checkpoint at {}, starting from the beginning", options.checkpoint.display());
            Ok(0)
        }
    }
}

/// Synchronizes an already converted cache.
pub async fn sync_cache(
    config: &AppConfig,
    store: Arc<dyn RemoteStore>,
    cache: &EntityCache,
    options: &SyncOptions,
    signal: &SyncSignal,
) -> Result<SyncReport> {
    let begin = begin_index(options).await?;
    let roots = roots_from(cache, begin);
    let checkpoint: Arc<dyn CheckpointSink> = Arc::new(FileCheckpoint::new(&options.checkpoint));
    let engine = SyncEngine::new(store, config.sync.clone(), checkpoint)?;

    engine
        .run(options.mode, &roots, begin, signal)
        .await
        .context("synchronization aborted")
}

/// Deletes every record of the configured namespace.
pub async fn clear(config: &AppConfig, store: Arc<dyn RemoteStore>) -> Result<usize> {
    let engine = SyncEngine::new(store, config.sync.clone(), Arc::new(MemoryCheckpoint::new()))?;
    engine.clear_namespace().await.context("failed to clear namespace")
}
