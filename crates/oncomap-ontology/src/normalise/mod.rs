//! Mention normalisation.
//!
//! `BiomarkerNormaliser` maps free-text biomarker mentions to matchable,
//! ontology-aligned keys (gene alias unification plus canonical phrases).

pub mod biomarker;

pub use biomarker::{BiomarkerNormaliser, CANONICAL_FORMS, GENE_ALIASES};
