//! Coverage summary for a mapping run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Ontology, TierMapping};
use crate::pipeline::MappingRun;

/// Counts per tier and per vocabulary, written next to the mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSummary {
    pub total: usize,
    pub strict_matched: usize,
    pub lenient_matched: usize,
    pub strict_umls: usize,
    pub strict_ncit: usize,
    pub lenient_umls: usize,
    pub lenient_ncit: usize,
    pub search_failures: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub generated_at: DateTime<Utc>,
}

impl MappingSummary {
    pub fn from_run(run: &MappingRun) -> Self {
        let strict = &run.mapping.strict;
        let lenient = &run.mapping.lenient;
        Self {
            total: run.mapping.len(),
            strict_matched: matched(strict),
            lenient_matched: matched(lenient),
            strict_umls: matched_in(strict, Ontology::Umls),
            strict_ncit: matched_in(strict, Ontology::Ncit),
            lenient_umls: matched_in(lenient, Ontology::Umls),
            lenient_ncit: matched_in(lenient, Ontology::Ncit),
            search_failures: run.search_failures,
            skipped: run.skipped,
            cancelled: run.cancelled,
            generated_at: Utc::now(),
        }
    }

    /// Share of mentions with a strict match, 0.0 for an empty run.
    pub fn strict_coverage(&self) -> f64 {
        ratio(self.strict_matched, self.total)
    }

    pub fn lenient_coverage(&self) -> f64 {
        ratio(self.lenient_matched, self.total)
    }
}

fn matched(tier: &TierMapping) -> usize {
    tier.values().filter(|m| m.is_some()).count()
}

fn matched_in(tier: &TierMapping, ontology: Ontology) -> usize {
    tier.values()
        .flatten()
        .filter(|m| m.ontology == ontology)
        .count()
}

fn ratio(n: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { n as f64 / total as f64 }
}
