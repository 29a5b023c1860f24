//! Mention → ontology mapping pipeline.
//!
//! For every distinct mention in the frequency table:
//!   1. Normalise the mention
//!   2. Search the broad (UMLS) and domain (NCIt) vocabularies concurrently
//!   3. Decide strict and lenient matches from the same two candidate lists
//!   4. Record both under the mention's original spelling
//!
//! Every input mention gets exactly one entry in each tier, `None` when
//! unmatched, a search failed, or the run was cancelled before reaching it.
//! Each entry depends only on its own mention, so the result is independent
//! of processing order and of `concurrency`.
//!
//! Requests are paced by a single shared interval: with N terms in flight the
//! aggregate request rate toward each service is the same as sequential.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use oncomap_common::PipelineConfig;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::matcher::match_tiers;
use crate::models::{BiomarkerMapping, ConceptRecord, MatchResult, TermFrequencyTable};
use crate::normalise::BiomarkerNormaliser;
use crate::sources::{ConceptSource, SearchOutcome};

// ── Options ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Minimum spacing between term starts. Zero disables pacing.
    pub pacing: Duration,
    /// Terms processed at once (1 = strictly sequential).
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(250),
            concurrency: 1,
        }
    }
}

impl From<&PipelineConfig> for PipelineOptions {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            pacing: Duration::from_millis(cfg.pacing_ms),
            concurrency: cfg.concurrency.max(1),
        }
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Decision for a single mention.
#[derive(Debug, Clone, PartialEq)]
pub struct TermMapping {
    pub mention: String,
    pub normalized: String,
    pub strict: Option<MatchResult>,
    pub lenient: Option<MatchResult>,
    /// Number of vocabulary searches that failed for this term (0–2).
    pub search_failures: usize,
}

/// Output of a full run.
#[derive(Debug, Clone, Default)]
pub struct MappingRun {
    pub mapping: BiomarkerMapping,
    /// True if cancellation was observed before every term was searched.
    pub cancelled: bool,
    /// Mentions recorded as unmatched without being searched (cancellation).
    pub skipped: usize,
    pub search_failures: usize,
}

enum TermStep {
    Mapped(TermMapping),
    Skipped(String),
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct MappingPipeline {
    normaliser: Arc<BiomarkerNormaliser>,
    broad: Arc<dyn ConceptSource>,
    domain: Arc<dyn ConceptSource>,
    options: PipelineOptions,
}

impl MappingPipeline {
    pub fn new(
        normaliser: Arc<BiomarkerNormaliser>,
        broad: Arc<dyn ConceptSource>,
        domain: Arc<dyn ConceptSource>,
        options: PipelineOptions,
    ) -> Self {
        Self { normaliser, broad, domain, options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Map every mention in `table`. Always returns one entry per mention per tier.
    pub async fn build_mappings(&self, table: &TermFrequencyTable) -> BiomarkerMapping {
        let (_never, cancel) = watch::channel(false);
        self.build_mappings_until(table, cancel).await.mapping
    }

    /// As [`build_mappings`](Self::build_mappings), checking `cancel` between terms.
    /// Mentions not yet started when cancellation is seen are recorded as unmatched.
    #[instrument(skip_all, fields(terms = table.len()))]
    pub async fn build_mappings_until(
        &self,
        table: &TermFrequencyTable,
        cancel: watch::Receiver<bool>,
    ) -> MappingRun {
        info!("Total biomarkers to map: {}", table.len());

        let pacer = self.pacer();
        let pacer = &pacer;
        let cancel = &cancel;

        let steps: Vec<TermStep> = stream::iter(table.keys())
            .map(|mention| async move {
                if *cancel.borrow() {
                    return TermStep::Skipped(mention.clone());
                }
                if let Some(pacer) = pacer {
                    pacer.lock().await.tick().await;
                }
                if *cancel.borrow() {
                    return TermStep::Skipped(mention.clone());
                }
                TermStep::Mapped(self.map_term(mention).await)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut run = MappingRun::default();
        for step in steps {
            match step {
                TermStep::Mapped(term) => {
                    run.search_failures += term.search_failures;
                    run.mapping.insert(&term.mention, term.strict, term.lenient);
                }
                TermStep::Skipped(mention) => {
                    run.skipped += 1;
                    run.mapping.insert(&mention, None, None);
                }
            }
        }
        run.cancelled = run.skipped > 0;

        if run.cancelled {
            warn!(skipped = run.skipped, "Run cancelled; unsearched mentions recorded as unmatched");
        }
        debug_assert_eq!(run.mapping.strict.len(), table.len());
        debug_assert_eq!(run.mapping.lenient.len(), table.len());
        run
    }

    /// Normalise, search and match a single mention.
    pub async fn map_term(&self, mention: &str) -> TermMapping {
        let normalized = self.normaliser.normalise(mention);
        info!("Mapping: \"{}\" → normalized: \"{}\"", mention, normalized);

        let (broad_outcome, domain_outcome) = tokio::join!(
            self.broad.search(&normalized),
            self.domain.search(&normalized),
        );

        let mut search_failures = 0;
        let broad = collapse(self.broad.as_ref(), mention, broad_outcome, &mut search_failures);
        let domain = collapse(self.domain.as_ref(), mention, domain_outcome, &mut search_failures);

        let (strict, lenient) = match_tiers(&normalized, &broad, &domain);
        debug!(
            mention,
            strict = strict.as_ref().map(|m| m.code.as_str()),
            lenient = lenient.as_ref().map(|m| m.code.as_str()),
            "term mapped"
        );

        TermMapping {
            mention: mention.to_string(),
            normalized,
            strict,
            lenient,
            search_failures,
        }
    }

    fn pacer(&self) -> Option<Mutex<Interval>> {
        if self.options.pacing.is_zero() {
            return None;
        }
        let mut ticker = interval(self.options.pacing);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(Mutex::new(ticker))
    }
}

/// A failed search counts as zero candidates; the reason is logged, not propagated.
fn collapse(
    source: &dyn ConceptSource,
    mention: &str,
    outcome: SearchOutcome,
    failures: &mut usize,
) -> Vec<ConceptRecord> {
    if let Some(reason) = outcome.failure() {
        *failures += 1;
        warn!(ontology = %source.ontology(), mention, %reason, "vocabulary search failed; treating as no candidates");
    }
    outcome.into_candidates()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchTier, Ontology};
    use crate::sources::SearchFailure;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned per-term responses; unknown terms return no candidates.
    struct FakeSource {
        ontology: Ontology,
        responses: HashMap<String, SearchOutcome>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(ontology: Ontology) -> Self {
            Self { ontology, responses: HashMap::new(), calls: AtomicUsize::new(0) }
        }

        fn respond(mut self, term: &str, outcome: SearchOutcome) -> Self {
            self.responses.insert(term.to_string(), outcome);
            self
        }
    }

    #[async_trait]
    impl ConceptSource for FakeSource {
        fn ontology(&self) -> Ontology { self.ontology }

        async fn search(&self, term: &str) -> SearchOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(term)
                .cloned()
                .unwrap_or(SearchOutcome::Found(vec![]))
        }
    }

    fn pipeline(broad: FakeSource, domain: FakeSource) -> MappingPipeline {
        MappingPipeline::new(
            Arc::new(BiomarkerNormaliser::new()),
            Arc::new(broad),
            Arc::new(domain),
            PipelineOptions { pacing: Duration::ZERO, concurrency: 1 },
        )
    }

    fn table(entries: &[(&str, u64)]) -> TermFrequencyTable {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[tokio::test]
    async fn test_map_term_uses_normalized_query() {
        let broad = FakeSource::new(Ontology::Umls).respond(
            "her2 positive neoplasm",
            SearchOutcome::Found(vec![ConceptRecord::new(Ontology::Umls, "U1", "HER2 positive neoplasm")]),
        );
        let p = pipeline(broad, FakeSource::new(Ontology::Ncit));
        let t = p.map_term("her2-positive").await;
        assert_eq!(t.normalized, "her2 positive neoplasm");
        assert_eq!(t.strict.as_ref().unwrap().match_type, MatchTier::Strict);
        assert_eq!(t.lenient.as_ref().unwrap().code, "U1");
        assert_eq!(t.search_failures, 0);
    }

    #[tokio::test]
    async fn test_failed_searches_give_nulls() {
        let broad = FakeSource::new(Ontology::Umls)
            .respond("brca1 gene mutation", SearchOutcome::Failed(SearchFailure::Timeout));
        let domain = FakeSource::new(Ontology::Ncit)
            .respond("brca1 gene mutation", SearchOutcome::Failed(SearchFailure::Status(500)));
        let p = pipeline(broad, domain);
        let run = p.build_mappings_until(&table(&[("BRCA1 mutation", 2)]), watch::channel(false).1).await;
        assert_eq!(run.mapping.strict.get("BRCA1 mutation"), Some(&None));
        assert_eq!(run.mapping.lenient.get("BRCA1 mutation"), Some(&None));
        assert_eq!(run.search_failures, 2);
        assert!(!run.cancelled);
    }

    #[tokio::test]
    async fn test_one_source_failing_does_not_hide_the_other() {
        let broad = FakeSource::new(Ontology::Umls)
            .respond("erbb2 gene amplification", SearchOutcome::Failed(SearchFailure::Timeout));
        let domain = FakeSource::new(Ontology::Ncit).respond(
            "erbb2 gene amplification",
            SearchOutcome::Found(vec![ConceptRecord::new(Ontology::Ncit, "C1", "ERBB2 Gene Amplification")]),
        );
        let p = pipeline(broad, domain);
        let t = p.map_term("HER2 amplification").await;
        assert_eq!(t.strict.unwrap().ontology, Ontology::Ncit);
        assert_eq!(t.search_failures, 1);
    }

    #[tokio::test]
    async fn test_empty_normalized_term_is_searched() {
        let broad = FakeSource::new(Ontology::Umls).respond(
            "",
            SearchOutcome::Found(vec![ConceptRecord::new(Ontology::Umls, "U9", "Anything")]),
        );
        let p = pipeline(broad, FakeSource::new(Ontology::Ncit));
        let mapping = p.build_mappings(&table(&[("(germline)", 1), ("", 1)])).await;
        assert_eq!(mapping.len(), 2);
        // "" is contained in every preferred term, never equal to one
        assert!(mapping.strict.values().all(Option::is_none));
        for lenient in mapping.lenient.values() {
            assert_eq!(lenient.as_ref().unwrap().code, "U9");
        }
    }

    #[tokio::test]
    async fn test_empty_normalized_term_without_candidates_is_null() {
        let p = pipeline(FakeSource::new(Ontology::Umls), FakeSource::new(Ontology::Ncit));
        let mapping = p.build_mappings(&table(&[("()", 1)])).await;
        assert_eq!(mapping.strict.get("()"), Some(&None));
        assert_eq!(mapping.lenient.get("()"), Some(&None));
    }

    #[tokio::test]
    async fn test_each_term_searched_once_per_source() {
        let broad = Arc::new(FakeSource::new(Ontology::Umls));
        let domain = Arc::new(FakeSource::new(Ontology::Ncit));
        let p = MappingPipeline::new(
            Arc::new(BiomarkerNormaliser::new()),
            broad.clone(),
            domain.clone(),
            PipelineOptions { pacing: Duration::ZERO, concurrency: 3 },
        );
        let t = table(&[("her2", 1), ("brca2 mutation", 4), ("pd-l1", 2), ("ntrk fusion", 1)]);
        let mapping = p.build_mappings(&t).await;
        assert_eq!(mapping.len(), 4);
        assert_eq!(broad.calls.load(Ordering::SeqCst), 4);
        assert_eq!(domain.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_records_all_as_null() {
        let broad = Arc::new(FakeSource::new(Ontology::Umls));
        let p = MappingPipeline::new(
            Arc::new(BiomarkerNormaliser::new()),
            broad.clone(),
            Arc::new(FakeSource::new(Ontology::Ncit)),
            PipelineOptions { pacing: Duration::ZERO, concurrency: 1 },
        );
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let t = table(&[("her2", 1), ("brca1", 1)]);
        let run = p.build_mappings_until(&t, rx).await;
        assert!(run.cancelled);
        assert_eq!(run.skipped, 2);
        assert_eq!(run.mapping.strict.len(), 2);
        assert_eq!(run.mapping.lenient.len(), 2);
        assert_eq!(broad.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_spaces_terms() {
        let p = MappingPipeline::new(
            Arc::new(BiomarkerNormaliser::new()),
            Arc::new(FakeSource::new(Ontology::Umls)),
            Arc::new(FakeSource::new(Ontology::Ncit)),
            PipelineOptions { pacing: Duration::from_millis(250), concurrency: 2 },
        );
        let t = table(&[("a", 1), ("b", 1), ("c", 1), ("d", 1)]);
        let start = tokio::time::Instant::now();
        let mapping = p.build_mappings(&t).await;
        assert_eq!(mapping.len(), 4);
        // first tick is immediate, three more at 250ms spacing
        assert!(start.elapsed() >= Duration::from_millis(750));
    }

    #[test]
    fn test_options_from_config() {
        let cfg = PipelineConfig { pacing_ms: 100, concurrency: 0 };
        let opts = PipelineOptions::from(&cfg);
        assert_eq!(opts.pacing, Duration::from_millis(100));
        assert_eq!(opts.concurrency, 1);
    }
}
