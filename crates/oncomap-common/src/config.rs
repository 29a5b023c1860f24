//! Run configuration for ontology mapping.
//!
//! Read from TOML (see `oncomap.example.toml`). Every field has a default so
//! an empty file is a valid configuration; only the UMLS credential has no
//! usable default and is checked by [`MappingConfig::validate`].

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{OncomapError, Result};

/// Complete mapping run configuration.
#[derive(Debug, Default, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub vocabulary: VocabularyConfig,
}

// ── Sources ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub umls: UmlsSourceConfig,

    #[serde(default)]
    pub ncit: NcitSourceConfig,
}

/// UMLS Terminology Services search (broad thesaurus).
#[derive(Debug, Deserialize)]
pub struct UmlsSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_umls_url")]
    pub base_url: String,

    /// UMLS release, e.g. "current" or "2024AA"
    #[serde(default = "default_umls_version")]
    pub version: String,

    #[serde(default = "default_search_type")]
    pub search_type: String,

    /// UTS API key. Usually supplied via `UMLS_API_KEY` rather than the file.
    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_true() -> bool { true }
fn default_umls_url() -> String { "https://uts-ws.nlm.nih.gov/rest/search".to_string() }
fn default_umls_version() -> String { "current".to_string() }
fn default_search_type() -> String { "words".to_string() }
fn default_timeout_secs() -> u64 { 10 }

impl Default for UmlsSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_umls_url(),
            version: default_umls_version(),
            search_type: default_search_type(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// NCI EVS REST concept search (domain thesaurus).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcitSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_ncit_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ncit_url() -> String { "https://api-evsrest.nci.nih.gov/api/v1/concepts/search".to_string() }

impl Default for NcitSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ncit_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum delay between consecutive terms, in milliseconds.
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,

    /// Terms in flight at once. Pacing still applies across all of them.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_pacing_ms() -> u64 { 250 }
fn default_concurrency() -> usize { 1 }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pacing_ms: default_pacing_ms(),
            concurrency: default_concurrency(),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_strict_path")]
    pub strict_path: PathBuf,

    #[serde(default = "default_lenient_path")]
    pub lenient_path: PathBuf,

    /// Coverage summary JSON, written only when set.
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
}

fn default_strict_path() -> PathBuf { PathBuf::from("mapped_strict.json") }
fn default_lenient_path() -> PathBuf { PathBuf::from("mapped_lenient.json") }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            strict_path: default_strict_path(),
            lenient_path: default_lenient_path(),
            summary_path: None,
        }
    }
}

// ── Vocabulary ────────────────────────────────────────────────────────────────

/// Site-specific additions to the built-in alias and canonical tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VocabularyConfig {
    /// Extra `[alias, standard]` pairs, applied after the built-in aliases in this order.
    #[serde(default)]
    pub aliases: Vec<(String, String)>,

    /// Extra normalized phrase → canonical form entries.
    #[serde(default)]
    pub canonical: BTreeMap<String, String>,
}

impl MappingConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| OncomapError::Config(e.to_string()))
    }

    /// Read and parse a TOML configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OncomapError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `UMLS_API_KEY` / `UMLS_VERSION` style overrides.
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("UMLS_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.sources.umls.api_key = Some(SecretString::from(key));
        }
        if let Some(version) = lookup("UMLS_VERSION").filter(|v| !v.trim().is_empty()) {
            self.sources.umls.version = version;
        }
    }

    /// Fail fast on settings that would silently null every mapping.
    pub fn validate(&self) -> Result<()> {
        if self.sources.umls.enabled && self.sources.umls.api_key.is_none() {
            return Err(OncomapError::Config(
                "UMLS search is enabled but no API key is configured \
                 (set UMLS_API_KEY or sources.umls.api_key, or disable sources.umls)"
                    .to_string(),
            ));
        }
        if !self.sources.umls.enabled && !self.sources.ncit.enabled {
            return Err(OncomapError::Config(
                "both vocabulary sources are disabled".to_string(),
            ));
        }
        if self.pipeline.concurrency == 0 {
            return Err(OncomapError::Config(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }
        for (name, enabled, timeout) in [
            ("umls", self.sources.umls.enabled, self.sources.umls.timeout_secs),
            ("ncit", self.sources.ncit.enabled, self.sources.ncit.timeout_secs),
        ] {
            if enabled && timeout == 0 {
                return Err(OncomapError::Config(format!(
                    "sources.{}.timeout_secs must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}
