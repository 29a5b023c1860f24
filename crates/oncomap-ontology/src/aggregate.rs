//! Vocabulary aggregation over LLM extraction output.
//!
//! The extraction step emits one record per trial with inclusion/exclusion
//! biomarker lists. Elements are usually strings but grouped mentions come
//! through as nested lists, which are flattened one level. Two file layouts
//! are accepted:
//!
//! ```json
//! [ { "nct_id": "NCT01", "inclusion_biomarker": ["HER2+"], "exclusion_biomarker": [] } ]
//! { "results": [ { "Precited": [ { "inclusion_biomarker": [["BRCA1", "BRCA2"]] } ] } ] }
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::TermFrequencyTable;

/// One list element: a single mention or a group of mentions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MentionGroup {
    One(String),
    Many(Vec<String>),
}

impl MentionGroup {
    fn iter(&self) -> impl Iterator<Item = &str> {
        let items: &[String] = match self {
            MentionGroup::One(s) => std::slice::from_ref(s),
            MentionGroup::Many(v) => v.as_slice(),
        };
        items.iter().map(String::as_str)
    }
}

/// Biomarkers extracted from one trial.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExtractionRecord {
    #[serde(default)]
    pub nct_id: Option<String>,
    #[serde(default)]
    pub inclusion_biomarker: Vec<MentionGroup>,
    #[serde(default)]
    pub exclusion_biomarker: Vec<MentionGroup>,
}

impl ExtractionRecord {
    /// Inclusion then exclusion mentions, flattened, as extracted.
    pub fn mentions(&self) -> impl Iterator<Item = &str> {
        self.inclusion_biomarker
            .iter()
            .chain(self.exclusion_biomarker.iter())
            .flat_map(MentionGroup::iter)
    }
}

#[derive(Debug, Deserialize)]
struct ResultBlock {
    #[serde(rename = "Precited", alias = "Predicted", default)]
    predicted: Vec<ExtractionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExtractionFile {
    Records(Vec<ExtractionRecord>),
    Wrapped { results: Vec<ResultBlock> },
}

/// Parse extraction output in either supported layout.
/// For the wrapped layout only the first result block is used.
pub fn parse_extraction(json: &str) -> serde_json::Result<Vec<ExtractionRecord>> {
    Ok(match serde_json::from_str::<ExtractionFile>(json)? {
        ExtractionFile::Records(records) => records,
        ExtractionFile::Wrapped { results } => results
            .into_iter()
            .next()
            .map(|block| block.predicted)
            .unwrap_or_default(),
    })
}

/// Count every mention across all records, trimmed and lowercased.
pub fn aggregate_mentions(records: &[ExtractionRecord]) -> TermFrequencyTable {
    let mut counts = TermFrequencyTable::new();
    for mention in records.iter().flat_map(ExtractionRecord::mentions) {
        let key = mention.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Trial id → flattened mentions. Records without an id are keyed `trial_<index>`.
pub fn mentions_by_trial(records: &[ExtractionRecord]) -> BTreeMap<String, Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, rec)| {
            let id = rec.nct_id.clone().unwrap_or_else(|| format!("trial_{}", idx));
            (id, rec.mentions().map(String::from).collect())
        })
        .collect()
}
