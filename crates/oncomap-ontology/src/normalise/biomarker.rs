//! Biomarker mention normalisation.
//!
//! Turns a free-text mention as extracted from trial eligibility text into a
//! matchable key:
//!
//! 1. lowercase
//! 2. drop parenthesised qualifiers ("her2 amplification (NGS)"), trim
//! 3. fold en/em dashes to `-`
//! 4. collapse whitespace
//! 5. substitute gene aliases (`her2` → `erbb2`, ...) in table order
//! 6. rewrite known phrases to their canonical ontology-aligned form
//! 7. trim
//!
//! The canonical table is consulted on the cleaned text both before and after
//! alias substitution, and canonical forms themselves are left untouched, so
//! `normalise(normalise(x)) == normalise(x)` holds for every input.
//!
//! Usage:
//! ```ignore
//! let n = BiomarkerNormaliser::new();
//! assert_eq!(n.normalise("HER2 Amplification (NGS)"), "erbb2 gene amplification");
//! ```

use std::collections::{HashMap, HashSet};

use oncomap_common::VocabularyConfig;
use regex::Regex;
use tracing::debug;

/// Informal gene symbol → standard symbol. Order is significant.
pub const GENE_ALIASES: &[(&str, &str)] = &[
    ("her2", "erbb2"),
    ("neu", "erbb2"),
    ("brca-1", "brca1"),
    ("brca-2", "brca2"),
];

/// Known phrase → NCIt-aligned canonical phrase. Exact-string lookup only.
pub const CANONICAL_FORMS: &[(&str, &str)] = &[
    // HER2 amplification
    ("her2 amplification", "erbb2 gene amplification"),
    ("erbb2 amplification", "erbb2 gene amplification"),
    // HER2 positivity
    ("her2 positive", "her2 positive neoplasm"),
    ("her2-positive", "her2 positive neoplasm"),
    ("her2 positive expression", "her2 positive neoplasm"),
    ("her2 positive breast cancer", "her2 positive neoplasm"),
    // Exon 20 insertions
    ("her2 exon 20 insertion", "erbb2 exon 20 insertion mutation"),
    ("her2 exon20 insertion", "erbb2 exon 20 insertion mutation"),
    ("her2 exon 20 insertion mutation", "erbb2 exon 20 insertion mutation"),
    // Point mutations
    ("her2 l755s", "erbb2 l755s"),
    ("her2 l755a", "erbb2 l755a"),
    ("her2 v777l", "erbb2 v777l"),
    ("her2 s310f", "erbb2 s310f"),
    ("her2 v659e", "erbb2 v659e"),
    // BRCA
    ("brca1 mutation", "brca1 gene mutation"),
    ("brca2 mutation", "brca2 gene mutation"),
    ("gbrca1 mutation", "brca1 gene mutation"),
    ("gbrca2 mutation", "brca2 gene mutation"),
    ("germline brca mutation", "brca gene mutation"),
    ("somatic brca mutation", "brca gene mutation"),
];

/// Deterministic mention normaliser. Build once at startup and share.
pub struct BiomarkerNormaliser {
    aliases: Vec<(String, String)>,
    canonical: HashMap<String, String>,
    /// Values of `canonical`; already normal, never rewritten.
    canonical_forms: HashSet<String>,
    re_parenthetical: Regex,
}

impl BiomarkerNormaliser {
    /// Normaliser with the built-in alias and canonical tables.
    pub fn new() -> Self {
        Self::from_tables(
            GENE_ALIASES.iter().map(|(a, s)| (a.to_string(), s.to_string())).collect(),
            CANONICAL_FORMS.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    /// Built-in tables plus site-specific additions from configuration.
    /// Extra aliases run after the built-in ones; extra canonical entries
    /// replace built-in entries with the same key.
    pub fn with_vocabulary(vocab: &VocabularyConfig) -> Self {
        let mut aliases: Vec<(String, String)> = GENE_ALIASES
            .iter()
            .map(|(a, s)| (a.to_string(), s.to_string()))
            .collect();
        aliases.extend(
            vocab.aliases
                .iter()
                .filter(|(a, _)| !a.trim().is_empty())
                .map(|(a, s)| (a.trim().to_lowercase(), s.trim().to_lowercase())),
        );

        let mut canonical: HashMap<String, String> = CANONICAL_FORMS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        for (k, v) in &vocab.canonical {
            canonical.insert(k.trim().to_lowercase(), v.trim().to_lowercase());
        }

        Self::from_tables(aliases, canonical)
    }

    fn from_tables(aliases: Vec<(String, String)>, canonical: HashMap<String, String>) -> Self {
        let canonical_forms = canonical.values().cloned().collect();
        Self {
            aliases,
            canonical,
            canonical_forms,
            // (?s): a qualifier split across lines is still one qualifier
            re_parenthetical: Regex::new(r"(?s)\(.*?\)").unwrap(),
        }
    }

    /// Normalise a raw mention. Never fails; empty input gives an empty key.
    pub fn normalise(&self, raw: &str) -> String {
        let cleaned = self.clean(raw);

        if self.canonical_forms.contains(&cleaned) {
            return cleaned;
        }
        if let Some(canonical) = self.canonical.get(&cleaned) {
            debug!(raw, canonical = canonical.as_str(), "canonical rewrite");
            return canonical.clone();
        }

        let aliased = self.apply_aliases(&cleaned);
        match self.canonical.get(&aliased) {
            Some(canonical) => {
                debug!(raw, canonical = canonical.as_str(), "canonical rewrite after aliasing");
                canonical.clone()
            }
            None => aliased.trim().to_string(),
        }
    }

    /// Steps 1–4: case, qualifiers, dashes, whitespace.
    pub fn clean(&self, raw: &str) -> String {
        let lowered = raw.to_lowercase();
        let stripped = self.re_parenthetical.replace_all(&lowered, "");
        let dashed = stripped.trim().replace(['\u{2013}', '\u{2014}'], "-");
        dashed.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Substring replacement of every alias, in table order.
    pub fn apply_aliases(&self, term: &str) -> String {
        let mut out = term.to_string();
        for (alias, standard) in &self.aliases {
            if out.contains(alias.as_str()) {
                out = out.replace(alias.as_str(), standard);
            }
        }
        out
    }

    /// Exact canonical lookup.
    pub fn canonical_for(&self, term: &str) -> Option<&str> {
        self.canonical.get(term).map(String::as_str)
    }

    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }
}

impl Default for BiomarkerNormaliser {
    fn default() -> Self { Self::new() }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn norm() -> BiomarkerNormaliser { BiomarkerNormaliser::new() }

    const SAMPLES: &[&str] = &[
        "HER2 amplification",
        "her2 amplification (NGS)",
        "HER2 Amplification (ISH HER2/CEP17 ≥ 2.0)",
        "her2-positive",
        "HER2–positive",
        "her2 positive",
        "her2 positive neoplasm",
        "ERBB2 gene amplification",
        "  BRCA-1   mutation ",
        "gBRCA2 mutation",
        "germline BRCA mutation",
        "her2 exon 20 insertion (insYVMA)",
        "HER2 IHC 3+",
        "neu overexpression",
        "brca1/2",
        "(germline)",
        "",
        "   ",
        "a (b (c) d) e",
        "x (multi\nline) y",
        "unclosed ( paren",
        "her2—low",
    ];

    #[test]
    fn test_idempotent() {
        let n = norm();
        for s in SAMPLES {
            let once = n.normalise(s);
            assert_eq!(n.normalise(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_case_insensitive() {
        let n = norm();
        assert_eq!(n.normalise("HER2 amplification"), n.normalise("her2 amplification"));
        assert_eq!(n.normalise("Her2 V777L"), "erbb2 v777l");
    }

    #[test]
    fn test_parenthetical_stripped() {
        let n = norm();
        assert_eq!(n.normalise("her2 amplification (NGS)"), n.normalise("her2 amplification"));
        assert_eq!(n.normalise("her2 amplification (NGS)"), "erbb2 gene amplification");
        assert_eq!(n.normalise("x (multi\nline) y"), "x y");
    }

    #[test]
    fn test_canonical_rewrite() {
        let n = norm();
        assert_eq!(n.normalise("her2 positive"), "her2 positive neoplasm");
        assert_eq!(n.normalise("her2-positive"), "her2 positive neoplasm");
        assert_eq!(n.normalise("HER2 positive breast cancer"), "her2 positive neoplasm");
        assert_eq!(n.normalise("gbrca1 mutation"), "brca1 gene mutation");
        assert_eq!(n.normalise("somatic BRCA mutation"), "brca gene mutation");
    }

    #[test]
    fn test_unicode_dashes_folded() {
        let n = norm();
        assert_eq!(n.normalise("HER2–positive"), "her2 positive neoplasm");
        assert_eq!(n.normalise("HER2—positive"), "her2 positive neoplasm");
    }

    #[test]
    fn test_alias_then_canonical() {
        let n = norm();
        // "brca-1 mutation" only reaches the canonical table after aliasing
        assert_eq!(n.normalise("BRCA-1  mutation"), "brca1 gene mutation");
        assert_eq!(n.normalise("her2 exon20 insertion"), "erbb2 exon 20 insertion mutation");
    }

    #[test]
    fn test_alias_without_canonical() {
        let n = norm();
        assert_eq!(n.normalise("HER2 IHC 3+"), "erbb2 ihc 3+");
        assert_eq!(n.normalise("neu overexpression"), "erbb2 overexpression");
        assert_eq!(n.normalise("brca1/2"), "brca1/2");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(norm().normalise("  pd-l1 \t  expression\n"), "pd-l1 expression");
    }

    #[test]
    fn test_empty_and_qualifier_only() {
        let n = norm();
        assert_eq!(n.normalise(""), "");
        assert_eq!(n.normalise("   "), "");
        assert_eq!(n.normalise("(germline)"), "");
    }

    #[test]
    fn test_nested_and_unbalanced_parens() {
        let n = norm();
        assert_eq!(n.normalise("a (b (c) d) e"), "a d) e");
        assert_eq!(n.normalise("unclosed ( paren"), "unclosed ( paren");
    }

    #[test]
    fn test_canonical_forms_are_fixed_points() {
        let n = norm();
        for (_, form) in CANONICAL_FORMS {
            assert_eq!(n.normalise(form), *form);
        }
    }

    #[test]
    fn test_vocabulary_extensions() {
        let mut vocab = VocabularyConfig::default();
        vocab.aliases.push(("C-ERBB2".to_string(), "erbb2".to_string()));
        vocab.canonical.insert(
            "erbb2 overexpression".to_string(),
            "erbb2 protein overexpression".to_string(),
        );
        let n = BiomarkerNormaliser::with_vocabulary(&vocab);
        assert_eq!(n.normalise("c-erbb2 mutation"), "erbb2 mutation");
        assert_eq!(n.normalise("HER2 overexpression"), "erbb2 protein overexpression");
        assert_eq!(n.aliases().len(), GENE_ALIASES.len() + 1);
        // built-ins untouched
        assert_eq!(n.normalise("her2 positive"), "her2 positive neoplasm");
    }

    #[test]
    fn test_canonical_lookup_exact_only() {
        let n = norm();
        assert_eq!(n.canonical_for("her2 positive"), Some("her2 positive neoplasm"));
        assert_eq!(n.canonical_for("her2 positive "), None);
        assert_eq!(n.canonical_for("strongly her2 positive"), None);
    }
}
