//! Vocabulary search clients.

pub mod ncit;
pub mod umls;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{ConceptRecord, Ontology};

pub use ncit::NcitClient;
pub use umls::UmlsClient;

/// Common interface for vocabulary search services.
#[async_trait]
pub trait ConceptSource: Send + Sync {
    /// Vocabulary this source returns records for.
    fn ontology(&self) -> Ontology;

    /// Free-text search. Never errors: failures come back as `SearchOutcome::Failed`.
    async fn search(&self, term: &str) -> SearchOutcome;
}

/// Stand-in for a vocabulary disabled in configuration: always finds nothing.
pub struct DisabledSource(pub Ontology);

#[async_trait]
impl ConceptSource for DisabledSource {
    fn ontology(&self) -> Ontology { self.0 }

    async fn search(&self, _term: &str) -> SearchOutcome {
        SearchOutcome::Found(Vec::new())
    }
}

/// Why a search produced no usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("request blocked: {0}")]
    Blocked(String),
}

impl SearchFailure {
    /// Classify a reqwest error. The URL is dropped so query credentials never reach logs.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchFailure::Timeout
        } else if err.is_decode() {
            SearchFailure::Malformed(err.without_url().to_string())
        } else {
            SearchFailure::Transport(err.without_url().to_string())
        }
    }
}

/// Result of one vocabulary query.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Vec<ConceptRecord>),
    Failed(SearchFailure),
}

impl SearchOutcome {
    /// Candidates in service ranking order; a failed search has none.
    pub fn into_candidates(self) -> Vec<ConceptRecord> {
        match self {
            SearchOutcome::Found(records) => records,
            SearchOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        match self {
            SearchOutcome::Found(_) => None,
            SearchOutcome::Failed(reason) => Some(reason),
        }
    }
}

impl From<Result<Vec<ConceptRecord>, SearchFailure>> for SearchOutcome {
    fn from(res: Result<Vec<ConceptRecord>, SearchFailure>) -> Self {
        match res {
            Ok(records) => SearchOutcome::Found(records),
            Err(reason) => SearchOutcome::Failed(reason),
        }
    }
}

/// Send a prepared GET and decode its JSON body. Anything but HTTP 200 is a failure.
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
) -> Result<serde_json::Value, SearchFailure> {
    let resp = request.send().await.map_err(SearchFailure::from_reqwest)?;

    let status = resp.status();
    if status != StatusCode::OK {
        return Err(SearchFailure::Status(status.as_u16()));
    }

    let body = resp.text().await.map_err(SearchFailure::from_reqwest)?;
    serde_json::from_str(&body).map_err(|e| SearchFailure::Malformed(e.to_string()))
}
