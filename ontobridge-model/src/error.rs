//! Error types for mapping document parsing.

use thiserror::Error;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Errors raised while reading a mapping document.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The mapping document is not valid JSON.
    #[error("mapping is not valid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level `skeleton` object is absent.
    #[error("mapping malformed: a skeleton object is required to describe how to process data")]
    MissingSkeleton,

    /// A skeleton node has an unsupported shape.
    #[error("skeleton malformed at {location}: {reason}")]
    MalformedSkeleton { location: String, reason: String },

    /// A mapping is missing its `_id` template or the template's `param`.
    #[error("missing \"_id\" template in mapping {mapping}")]
    MissingIdTemplate { mapping: String },

    /// A mapping is missing or has an unreadable `_class` rule.
    #[error("invalid \"_class\" rule in mapping {mapping}: {reason}")]
    InvalidClassRule { mapping: String, reason: String },

    /// An object property rule is incomplete.
    #[error("invalid object property rule on field {field} in mapping {mapping}: {reason}")]
    InvalidObjectProperty {
        mapping: String,
        field: String,
        reason: String,
    },

    /// A data property rule is incomplete.
    #[error("invalid data property rule for {key} in mapping {mapping}: {reason}")]
    InvalidDataProperty {
        mapping: String,
        key: String,
        reason: String,
    },

    /// A data property declares a scalar type outside the supported set.
    #[error("unknown scalar type {kind} for {key} in mapping {mapping}")]
    UnknownScalarKind {
        mapping: String,
        key: String,
        kind: String,
    },

    /// A skeleton or object property refers to a mapping that does not exist.
    #[error("unknown mapping {mapping_id} referenced from {referenced_from}")]
    UnknownMapping {
        mapping_id: String,
        referenced_from: String,
    },
}
