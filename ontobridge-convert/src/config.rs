use serde::{Deserialize, Serialize};

/// Default separator of value paths.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Default maximum entity nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Configuration for the transformation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Separator used to split value paths.
    pub separator: String,
    /// Maximum number of nested entity levels in one source tree.
    pub max_depth: usize,
    /// What to do with data keys that have no mapping rule.
    pub unmapped_keys: UnmappedKeyPolicy,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            unmapped_keys: UnmappedKeyPolicy::default(),
        }
    }
}

/// Handling of data keys that match neither a data nor an object property rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedKeyPolicy {
    /// Skip silently.
    #[default]
    Ignore,
    /// Skip with a warning.
    Warn,
    /// Abort the pass with [`ConvertError::UnmappedKey`](crate::ConvertError::UnmappedKey).
    Fail,
}
