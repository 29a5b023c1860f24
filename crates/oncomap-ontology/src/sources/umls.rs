//! UMLS Terminology Services (UTS) search client (broad thesaurus).
//!
//! Endpoint: https://uts-ws.nlm.nih.gov/rest/search/{version}
//! Params:   string=<term>&searchType=words&apiKey=<key>
//!
//! Response shape:
//! ```json
//! { "result": { "results": [ { "ui": "C1512413", "name": "ERBB2 Gene Amplification" } ] } }
//! ```

use async_trait::async_trait;
use oncomap_common::config::UmlsSourceConfig;
use oncomap_common::sandbox::SandboxClient as Client;
use oncomap_common::{OncomapError, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{fetch_json, ConceptSource, SearchFailure, SearchOutcome};
use crate::models::{ConceptRecord, Ontology};

pub const UMLS_SEARCH_URL: &str = "https://uts-ws.nlm.nih.gov/rest/search";

/// UTS returns this placeholder identifier when nothing matched.
const NO_RESULTS_UI: &str = "NONE";

pub struct UmlsClient {
    client: Client,
    base_url: String,
    version: String,
    search_type: String,
    api_key: SecretString,
}

impl UmlsClient {
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::with_timeout(timeout)?,
            base_url: UMLS_SEARCH_URL.to_string(),
            version: "current".to_string(),
            search_type: "words".to_string(),
            api_key,
        })
    }

    /// Build from configuration. A missing API key is a configuration error.
    pub fn from_config(cfg: &UmlsSourceConfig) -> Result<Self> {
        let key = cfg.api_key.as_ref().ok_or_else(|| {
            OncomapError::Config("UMLS API key missing (set UMLS_API_KEY)".to_string())
        })?;
        Ok(Self::new(
            SecretString::from(key.expose_secret().to_string()),
            Duration::from_secs(cfg.timeout_secs),
        )?
        .with_base_url(&cfg.base_url)
        .with_version(&cfg.version)
        .with_search_type(&cfg.search_type))
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn with_search_type(mut self, search_type: &str) -> Self {
        self.search_type = search_type.to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.version)
    }

    async fn search_words(&self, term: &str) -> std::result::Result<Vec<ConceptRecord>, SearchFailure> {
        let request = self
            .client
            .get(&self.endpoint())
            .map_err(|e| SearchFailure::Blocked(e.to_string()))?
            .query(&[
                ("string", term),
                ("searchType", self.search_type.as_str()),
                ("apiKey", self.api_key.expose_secret()),
            ]);

        let body = fetch_json(request).await?;
        let records = parse_umls_results(&body);
        debug!(n = records.len(), "UMLS candidates retrieved");
        Ok(records)
    }
}

#[async_trait]
impl ConceptSource for UmlsClient {
    fn ontology(&self) -> Ontology { Ontology::Umls }

    #[instrument(skip(self))]
    async fn search(&self, term: &str) -> SearchOutcome {
        self.search_words(term).await.into()
    }
}

/// Extract `result.results[]` as records, in service order.
/// A missing `result` or `results` means no candidates; hits without
/// `ui`/`name` and the "NONE" placeholder are skipped.
pub fn parse_umls_results(body: &serde_json::Value) -> Vec<ConceptRecord> {
    body["result"]["results"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let ui = hit["ui"].as_str()?;
                    let name = hit["name"].as_str()?;
                    if ui == NO_RESULTS_UI {
                        return None;
                    }
                    Some(ConceptRecord::new(Ontology::Umls, ui, name))
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_results_in_order() {
        let body = json!({
            "result": {
                "classType": "searchResults",
                "results": [
                    { "ui": "C1512413", "rootSource": "MTH", "name": "ERBB2 Gene Amplification" },
                    { "ui": "C0069515", "rootSource": "MTH", "name": "erbB-2 Receptor" }
                ]
            }
        });
        let recs = parse_umls_results(&body);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0], ConceptRecord::new(Ontology::Umls, "C1512413", "ERBB2 Gene Amplification"));
        assert_eq!(recs[1].code, "C0069515");
    }

    #[test]
    fn test_parse_skips_placeholder_and_partial_hits() {
        let body = json!({
            "result": { "results": [
                { "ui": "NONE", "name": "NO RESULTS" },
                { "name": "no identifier" },
                { "ui": "C0000001" }
            ]}
        });
        assert!(parse_umls_results(&body).is_empty());
    }

    #[test]
    fn test_parse_missing_result_is_empty() {
        assert!(parse_umls_results(&json!({})).is_empty());
        assert!(parse_umls_results(&json!({ "result": {} })).is_empty());
        assert!(parse_umls_results(&json!([1, 2, 3])).is_empty());
    }

    #[test]
    fn test_from_config_requires_key() {
        let cfg = UmlsSourceConfig::default();
        assert!(matches!(UmlsClient::from_config(&cfg), Err(OncomapError::Config(_))));
    }

    #[test]
    fn test_endpoint_includes_version() {
        let cfg = UmlsSourceConfig {
            api_key: Some(SecretString::from("k".to_string())),
            version: "2024AA".to_string(),
            base_url: "http://127.0.0.1:9/rest/search/".to_string(),
            ..Default::default()
        };
        let client = UmlsClient::from_config(&cfg).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/rest/search/2024AA");
        assert_eq!(client.ontology(), Ontology::Umls);
    }
}
