//! NCI EVS REST concept search client for NCIt, the oncology-specific thesaurus.
//!
//! Endpoint: https://api-evsrest.nci.nih.gov/api/v1/concepts/search?keyword=<term>
//!
//! Each element of `concepts[]` carries `code` and `preferredName`; recent
//! EVS releases only send `name`, which is used when `preferredName` is absent.

use async_trait::async_trait;
use oncomap_common::config::NcitSourceConfig;
use oncomap_common::sandbox::SandboxClient as Client;
use oncomap_common::Result;
use std::time::Duration;
use tracing::{debug, instrument};

use super::{fetch_json, ConceptSource, SearchFailure, SearchOutcome};
use crate::models::{ConceptRecord, Ontology};

pub const NCIT_SEARCH_URL: &str = "https://api-evsrest.nci.nih.gov/api/v1/concepts/search";

pub struct NcitClient {
    client: Client,
    base_url: String,
}

impl NcitClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::with_timeout(timeout)?,
            base_url: NCIT_SEARCH_URL.to_string(),
        })
    }

    pub fn from_config(cfg: &NcitSourceConfig) -> Result<Self> {
        Ok(Self::new(Duration::from_secs(cfg.timeout_secs))?.with_base_url(&cfg.base_url))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    async fn search_keyword(&self, term: &str) -> std::result::Result<Vec<ConceptRecord>, SearchFailure> {
        let request = self
            .client
            .get(&self.base_url)
            .map_err(|e| SearchFailure::Blocked(e.to_string()))?
            .query(&[("keyword", term)]);

        let body = fetch_json(request).await?;
        let records = parse_ncit_concepts(&body);
        debug!(n = records.len(), "NCIt candidates retrieved");
        Ok(records)
    }
}

#[async_trait]
impl ConceptSource for NcitClient {
    fn ontology(&self) -> Ontology { Ontology::Ncit }

    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> SearchOutcome {
        self.search_keyword(term).await.into()
    }
}

/// Extract `concepts[]` as records, in service order.
pub fn parse_ncit_concepts(body: &serde_json::Value) -> Vec<ConceptRecord> {
    body["concepts"]
        .as_array()
        .map(|concepts| {
            concepts
                .iter()
                .filter_map(|c| {
                    let code = c["code"].as_str()?;
                    let name = c["preferredName"].as_str().or_else(|| c["name"].as_str())?;
                    Some(ConceptRecord::new(Ontology::Ncit, code, name))
                })
                .collect()
        })
        .unwrap_or_default()
}
