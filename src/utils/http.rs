use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};

use crate::constants::DEFAULT_USER_AGENT;
use crate::error::SublinkError;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

/// Source of remote subscription bodies.
///
/// The normalizer asks for a body by URL plus extra request headers; how it
/// is obtained is up to the implementation.
pub trait Fetcher {
    fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<String, SublinkError>>;
}

/// Fetches subscriptions over HTTP(S) with a per-request timeout and a default
/// User-Agent. Per-request headers win over the default.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, SublinkError> {
        let user_agent = if user_agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            user_agent
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| SublinkError::Fetch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(HttpFetcher { client })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        HttpFetcher {
            client: Client::builder()
                .timeout(Duration::from_secs(DEFAULT_TIMEOUT))
                .user_agent(DEFAULT_USER_AGENT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<String, SublinkError> {
        debug!("Fetching subscription from {}", url);
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request
            .send()
            .await
            .map_err(|e| SublinkError::Fetch(format!("Failed to send request to {}: {}", url, e)))?;

        if response.status() != StatusCode::OK {
            return Err(SublinkError::Fetch(format!(
                "HTTP error {} from {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SublinkError::Fetch(format!("Failed to read response body: {}", e)))
    }
}

/// Serves bodies from memory, ignoring headers. Unknown URLs fail like an
/// unreachable host.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    bodies: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies.insert(url.to_string(), body.to_string());
        self
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str, _headers: &[(String, String)]) -> Result<String, SublinkError> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| SublinkError::Fetch(format!("{} is unreachable", url)))
    }
}
