//! Mapping-driven transformation of nested JSON records into statements.
//!
//! A [`Converter`] walks a complete source tree guided by the mapping's
//! skeleton, renders each entity's statements with the [`StatementEmitter`], and
//! reconciles the result into its durable [`EntityCache`](ontobridge_model::EntityCache)
//! with a mark-and-sweep pass.
//!
//! ```no_run
//! use ontobridge_convert::{ConvertConfig, Converter};
//! use ontobridge_model::MappingSpec;
//!
//! # fn run(mapping: &str, source: serde_json::Value) -> Result<(), Box<dyn std::error::Error>> {
//! let spec = MappingSpec::from_json_str(mapping)?;
//! let mut converter = Converter::new(spec, ConvertConfig::default());
//! let cache = converter.parse(&source)?;
//! for entity in cache.flatten() {
//!     print!("{}", entity.statements);
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod emitter;
mod engine;
mod error;
mod identifier;
pub mod literal;
mod resolver;

pub use config::{ConvertConfig, UnmappedKeyPolicy, DEFAULT_MAX_DEPTH, DEFAULT_SEPARATOR};
pub use emitter::StatementEmitter;
pub use engine::Converter;
pub use error::{ConvertError, ConvertResult};
pub use identifier::{IdentifierFn, IdentityFn};
pub use resolver::ValueResolver;
