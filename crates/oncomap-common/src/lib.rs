//! oncomap-common — Shared errors, configuration and the sandboxed HTTP client
//! used across all oncomap crates.

pub mod error;
pub mod config;
pub mod sandbox;

// Re-export commonly used types
pub use config::{MappingConfig, SourcesConfig, NcitSourceConfig, OutputConfig, PipelineConfig, UmlsSourceConfig, VocabularyConfig};
pub use error::{OncomapError, Result};
