//! Core model for ontobridge.
//!
//! Defines the types both the transformation and synchronization engines depend on:
//! - [`MappingSpec`]: the declarative mapping document (skeleton + entity mappings)
//! - [`Skeleton`]: the recursive schema describing how a source tree maps to entities
//! - [`Entity`] / [`EntityCache`]: identifier-keyed nested cache with mark-and-sweep
//! - [`wire`]: the statement text format shared by emitter and sync engine
//!
//! Nothing in this crate performs I/O.

mod entity;
mod error;
mod mapping;
mod scalar;
mod skeleton;
pub mod wire;

pub use entity::{Entity, EntityCache};
pub use error::{MappingError, MappingResult};
pub use mapping::{
    ClassRule, DataPropertyRule, EntityMapping, IdResolution, IdTemplate, LocationRule,
    MappingSpec, ObjectPropertyRule,
};
pub use scalar::ScalarKind;
pub use skeleton::{EntitySkeleton, Skeleton};
