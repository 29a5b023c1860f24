//! Strict and lenient concept matching.
//!
//! Both tiers are pure functions of (normalized term, broad candidates,
//! domain candidates). Broad (UMLS) candidates are scanned before domain
//! (NCIt) candidates, and within a list the service's own ranking decides:
//! the first acceptable record wins.
//!
//! - strict:  lowercased preferred term == normalized term
//! - lenient: either string contains the other
//!
//! Lenient containment is deliberately loose: a short key such as "erbb2"
//! accepts any longer concept name containing it. Downstream evaluation is
//! calibrated against exactly this behaviour.

use crate::models::{ConceptRecord, MatchResult, MatchTier};

/// Exact, case-insensitive match on the preferred term.
pub fn strict_match(
    normalized: &str,
    broad: &[ConceptRecord],
    domain: &[ConceptRecord],
) -> Option<MatchResult> {
    first_match(broad, domain, MatchTier::Strict, |name| name == normalized)
}

/// Bidirectional substring containment on the lowercased preferred term.
pub fn lenient_match(
    normalized: &str,
    broad: &[ConceptRecord],
    domain: &[ConceptRecord],
) -> Option<MatchResult> {
    first_match(broad, domain, MatchTier::Lenient, |name| {
        name.contains(normalized) || normalized.contains(name)
    })
}

/// Both tiers from one pair of candidate lists.
pub fn match_tiers(
    normalized: &str,
    broad: &[ConceptRecord],
    domain: &[ConceptRecord],
) -> (Option<MatchResult>, Option<MatchResult>) {
    (
        strict_match(normalized, broad, domain),
        lenient_match(normalized, broad, domain),
    )
}

fn first_match<F>(
    broad: &[ConceptRecord],
    domain: &[ConceptRecord],
    tier: MatchTier,
    accepts: F,
) -> Option<MatchResult>
where
    F: Fn(&str) -> bool,
{
    broad
        .iter()
        .chain(domain.iter())
        .find(|rec| accepts(&rec.preferred_term.to_lowercase()))
        .map(|rec| MatchResult::from_record(rec, tier))
}
