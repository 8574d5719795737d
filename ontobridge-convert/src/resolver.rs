//! Dotted value-path resolution.

use crate::error::{ConvertError, ConvertResult};
use serde_json::Value;

/// Descends into a JSON tree one path segment at a time.
///
/// At an array node the segment must be a non-negative index; at an object
/// node it is a key. Scalars cannot be descended into.
#[derive(Debug, Clone)]
pub struct ValueResolver {
    separator: String,
}

impl Default for ValueResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ValueResolver {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Resolves `path` against `value`.
    pub fn resolve<'v>(&self, path: &str, value: &'v Value) -> ConvertResult<&'v Value> {
        let mut current = value;
        for segment in path.split(self.separator.as_str()) {
            current = match current {
                Value::Array(items) => {
                    let index: usize = segment.parse().map_err(|_| ConvertError::InvalidPath {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })?;
                    items.get(index).ok_or_else(|| ConvertError::MissingField {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    })?
                }
                Value::Object(map) => map.get(segment).ok_or_else(|| ConvertError::MissingField {
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?,
                _ => {
                    return Err(ConvertError::MissingField {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    });
                }
            };
        }
        Ok(current)
    }
}
