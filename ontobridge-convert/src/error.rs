//! Error types for the transformation engine.

use ontobridge_model::{MappingError, ScalarKind};
use thiserror::Error;

/// Result type for transformation operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors that abort a transformation pass.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The mapping itself is malformed.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// A path segment indexing into an array is not a non-negative integer.
    #[error("invalid path {path}: segment {segment} cannot index a list")]
    InvalidPath { path: String, segment: String },

    /// A path segment names a key that the data does not have.
    #[error("missing field {segment} while resolving path {path}")]
    MissingField { path: String, segment: String },

    /// A field-dependent class found no class for the discriminator value.
    #[error(
        "could not find appropriate class for individual {identifier} with class field {field} and value {value}"
    )]
    UnresolvedClass {
        identifier: String,
        field: String,
        value: String,
    },

    /// A looked-up object property value is absent from its map.
    #[error(
        "value {value} of object property {predicate} on individual {identifier} is not in the property's identifier map"
    )]
    UnknownMappedValue {
        identifier: String,
        predicate: String,
        value: String,
    },

    /// An object property value has the wrong shape for its resolution mode.
    #[error(
        "could not resolve the target of object property {predicate} on individual {identifier}: expected {expected}, found {found}"
    )]
    PropertyTypeMismatch {
        identifier: String,
        predicate: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A custom-mode object property has no value to build an identifier from.
    #[error("object property {predicate} on individual {identifier} has no value for its custom identifier")]
    MissingCustomValue {
        identifier: String,
        predicate: String,
    },

    /// The value an identifier is built from is not a scalar.
    #[error("identifier value at {path} for mapping {mapping} must be a scalar, found {found}")]
    InvalidIdentifierValue {
        mapping: String,
        path: String,
        found: &'static str,
    },

    /// A data property value cannot be coerced to its declared type.
    #[error("value {value} of {predicate} on individual {identifier} is not a valid {kind}")]
    InvalidLiteral {
        identifier: String,
        predicate: String,
        kind: ScalarKind,
        value: String,
    },

    /// A data node does not have the shape its skeleton expects.
    #[error("skeleton expected {expected} for mapping {mapping}, found {found}")]
    UnexpectedShape {
        mapping: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Strict mode: a data key has neither a data nor an object property rule.
    #[error("key {key} of individual {identifier} has no mapping rule")]
    UnmappedKey { identifier: String, key: String },

    /// Entity nesting went deeper than the configured maximum.
    #[error("entity nesting exceeded the maximum depth of {limit}")]
    RecursionLimitExceeded { limit: usize },
}

/// Short name of a JSON value's type, for error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
