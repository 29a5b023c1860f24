//! Data models for ontology reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Deduplicated vocabulary: mention (as extracted) → occurrence count.
pub type TermFrequencyTable = BTreeMap<String, u64>;

/// One tier of output: original mention → match, `None` serialises as `null`.
pub type TierMapping = BTreeMap<String, Option<MatchResult>>;

/// The two vocabularies consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ontology {
    /// UMLS Metathesaurus (broad biomedical coverage)
    #[serde(rename = "UMLS")]
    Umls,
    /// NCI Thesaurus (oncology-specific)
    #[serde(rename = "NCIt")]
    Ncit,
}

impl Ontology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ontology::Umls => "UMLS",
            Ontology::Ncit => "NCIt",
        }
    }
}

impl fmt::Display for Ontology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate concept returned by a vocabulary search.
/// `preferred_term` is stored exactly as the service returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub ontology: Ontology,
    pub code: String,
    pub preferred_term: String,
}

impl ConceptRecord {
    pub fn new(ontology: Ontology, code: impl Into<String>, preferred_term: impl Into<String>) -> Self {
        Self {
            ontology,
            code: code.into(),
            preferred_term: preferred_term.into(),
        }
    }
}

/// Match confidence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Strict,
    Lenient,
}

/// A concept accepted for a mention under one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub ontology: Ontology,
    pub code: String,
    pub preferred_term: String,
    pub match_type: MatchTier,
}

impl MatchResult {
    pub fn from_record(record: &ConceptRecord, tier: MatchTier) -> Self {
        Self {
            ontology: record.ontology,
            code: record.code.clone(),
            preferred_term: record.preferred_term.clone(),
            match_type: tier,
        }
    }
}

/// Final artifact: one entry per input mention in each tier, `None` when unmatched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BiomarkerMapping {
    pub strict: TierMapping,
    pub lenient: TierMapping,
}

impl BiomarkerMapping {
    pub fn insert(&mut self, mention: &str, strict: Option<MatchResult>, lenient: Option<MatchResult>) {
        self.strict.insert(mention.to_string(), strict);
        self.lenient.insert(mention.to_string(), lenient);
    }

    pub fn len(&self) -> usize {
        self.strict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strict.is_empty()
    }
}
