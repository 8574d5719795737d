//! TOML configuration file.

use anyhow::{Context, Result};
use ontobridge_convert::ConvertConfig;
use ontobridge_sync::{HttpStoreConfig, SyncConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Every section and field is optional; missing ones take their defaults.
///
/// ```toml
/// [convert]
/// separator = "."
/// unmapped_keys = "warn"
///
/// [sync]
/// batch_size = 20
/// max_find_size = 500
///
/// [store]
/// endpoint = "https://store.example.org/api/"
/// namespace = "fog"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub convert: ConvertConfig,
    pub sync: SyncConfig,
    pub store: HttpStoreConfig,
}

impl AppConfig {
    /// Loads the file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
