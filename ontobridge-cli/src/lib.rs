//! ontobridge command-line pipeline.
//!
//! Library half of the `ontobridge` binary, kept separate so the pipeline
//! can be tested without a terminal or a live store.

pub mod config;
pub mod pipeline;

pub use config::AppConfig;
pub use pipeline::SyncOptions;
