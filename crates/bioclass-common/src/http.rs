use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use url::Url;

use crate::error::{BioclassError, Result};

/// Hosts every client may reach without further configuration.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "www.ebi.ac.uk", // ChEMBL
    "localhost",
    "127.0.0.1",
];

/// An HTTP client capped to an allowlist of hosts.
///
/// Timeouts live here rather than in the pipeline; callers never retry.
#[derive(Debug, Clone)]
pub struct ScopedClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl ScopedClient {
    /// Creates a client with the default allowlist and the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("bioclass/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BioclassError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            allowlist: DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect(),
        })
    }

    /// Creates a client that may also reach the host of `base_url`.
    pub fn for_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| BioclassError::Config(format!("Invalid base URL '{}': {}", base_url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| BioclassError::Config(format!("Base URL '{}' has no host", base_url)))?
            .to_string();

        let mut client = Self::new(timeout)?;
        client.allow_domain(&host);
        Ok(client)
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Exact host match or a subdomain of an allowed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        if !self.is_allowed(url) {
            return Err(BioclassError::DomainNotAllowed(url.to_string()));
        }
        Ok(self.client.get(url))
    }
}
