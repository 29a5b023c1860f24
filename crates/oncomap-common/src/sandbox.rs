use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::OncomapError;

/// Default per-request timeout for vocabulary services.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An HTTP client that only allows requests to approved vocabulary hosts.
/// Each adapter owns its own instance so timeouts stay independent.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    timeout: Duration,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and timeout.
    pub fn new() -> Result<Self, OncomapError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with the default allowlist and the given per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, OncomapError> {
        let domains = [
            "uts-ws.nlm.nih.gov",      // UMLS Terminology Services
            "api-evsrest.nci.nih.gov", // NCI EVS REST (NCIt)
            "localhost",
            "127.0.0.1",
        ];
        let allowlist = domains.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("oncomap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// GET request builder, refused for hosts outside the allowlist.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, OncomapError> {
        if !self.is_allowed(url) {
            return Err(OncomapError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.get(url))
    }
}
