//! oncomap-ontology — Reconciles free-text biomarker mentions against UMLS and NCIt.
//! - Mention normalisation (gene aliases, canonical phrases)
//! - Vocabulary search clients (UMLS UTS, NCI EVS)
//! - Strict / lenient matching
//! - Mapping pipeline and coverage summary
//! - Vocabulary aggregation from extraction output

pub mod aggregate;
pub mod files;
pub mod matcher;
pub mod models;
pub mod normalise;
pub mod pipeline;
pub mod sources;
pub mod summary;

pub use matcher::{lenient_match, strict_match};
pub use models::{BiomarkerMapping, ConceptRecord, MatchResult, MatchTier, Ontology, TermFrequencyTable};
pub use normalise::BiomarkerNormaliser;
pub use pipeline::{MappingPipeline, MappingRun, PipelineOptions};
pub use summary::MappingSummary;
