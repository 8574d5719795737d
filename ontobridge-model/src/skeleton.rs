//! The recursive schema that guides the transformation walk.

use crate::error::{MappingError, MappingResult};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

const MAPPING_ID_KEY: &str = "_mapping_id";
const RECURSIVE_KEY: &str = "_recursive";
const RECURSIVE_FIELD_KEY: &str = "_recursive_field";

/// One node of the skeleton tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Skeleton {
    /// The data node is an array; apply the inner skeleton to each element.
    List(Box<Skeleton>),
    /// The data node is one entity bound to a named mapping.
    Entity(EntitySkeleton),
    /// The data node is an unmapped object; descend into the named keys only.
    Container(IndexMap<String, Skeleton>),
}

/// A skeleton node bound to an entity mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySkeleton {
    pub mapping_id: String,
    /// When set, the same skeleton is reapplied to the value at this field.
    pub recursive_field: Option<String>,
    /// Child skeletons keyed by the data key they descend into.
    pub children: IndexMap<String, Skeleton>,
}

impl EntitySkeleton {
    pub fn new(mapping_id: impl Into<String>) -> Self {
        Self {
            mapping_id: mapping_id.into(),
            recursive_field: None,
            children: IndexMap::new(),
        }
    }
}

impl Skeleton {
    /// Parses a skeleton from its JSON form.
    pub fn from_value(value: &Value) -> MappingResult<Self> {
        Self::parse(value, "skeleton")
    }

    fn parse(value: &Value, location: &str) -> MappingResult<Self> {
        let malformed = |reason: &str| MappingError::MalformedSkeleton {
            location: location.to_string(),
            reason: reason.to_string(),
        };

        match value {
            Value::Array(items) => match items.as_slice() {
                [inner] => Ok(Self::List(Box::new(Self::parse(
                    inner,
                    &format!("{location}[]"),
                )?))),
                _ => Err(malformed("a list skeleton must hold exactly one element skeleton")),
            },
            Value::Object(node) => {
                let mut children = IndexMap::new();
                for (key, child) in node {
                    if matches!(key.as_str(), MAPPING_ID_KEY | RECURSIVE_KEY | RECURSIVE_FIELD_KEY) {
                        continue;
                    }
                    children.insert(key.clone(), Self::parse(child, &format!("{location}.{key}"))?);
                }

                let Some(mapping_id) = node.get(MAPPING_ID_KEY) else {
                    return Ok(Self::Container(children));
                };
                let mapping_id = mapping_id
                    .as_str()
                    .ok_or_else(|| malformed("\"_mapping_id\" must be a string"))?;

                let recursive = matches!(node.get(RECURSIVE_KEY), Some(Value::Bool(true)))
                    || matches!(node.get(RECURSIVE_KEY), Some(Value::String(s)) if s == "true");
                let recursive_field = match (recursive, node.get(RECURSIVE_FIELD_KEY)) {
                    (true, Some(Value::String(field))) => Some(field.clone()),
                    (true, _) => {
                        warn!(
                            "Mapping {} has been declared as recursive but could not find the \
                             _recursive_field declaration",
                            mapping_id
                        );
                        None
                    }
                    (false, _) => None,
                };

                Ok(Self::Entity(EntitySkeleton {
                    mapping_id: mapping_id.to_string(),
                    recursive_field,
                    children,
                }))
            }
            _ => Err(malformed("expected a list or an object")),
        }
    }

    /// Every mapping id referenced anywhere in this skeleton tree.
    pub fn mapping_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::List(inner) => stack.push(inner),
                Self::Entity(entity) => {
                    ids.push(entity.mapping_id.as_str());
                    stack.extend(entity.children.values());
                }
                Self::Container(children) => stack.extend(children.values()),
            }
        }
        ids
    }
}
