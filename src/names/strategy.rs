/// Resolution strategies - pluggable steps of the lookup chain
use crate::{
    config::{HttpClientConfig, NameApiConfig},
    error::{ResolverError, ResolverResult},
    names::WalletAddress,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// One step of the resolution chain.
///
/// `Ok(None)` means "this source has no name"; errors are logged by the
/// resolver and treated the same way.
#[async_trait]
pub trait NameStrategy: Send + Sync {
    /// Short label used in logs and metrics
    fn name(&self) -> &'static str;

    async fn lookup(&self, address: &WalletAddress) -> ResolverResult<Option<String>>;
}

/// Build the outbound HTTP client shared by the REST and RPC strategies
pub fn build_http_client(config: &HttpClientConfig) -> ResolverResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ResolverError::Internal(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Debug, Deserialize)]
struct ForwardResponse {
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReverseResponse {
    name: Option<String>,
    primary_name: Option<String>,
}

/// REST name backend client
#[derive(Clone)]
pub struct RestNameStrategy {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    reverse_path: Option<String>,
}

impl RestNameStrategy {
    pub fn new(client: reqwest::Client, config: &NameApiConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            reverse_path: config.reverse_path.clone(),
        }
    }

    /// Whether a reverse (address -> name) endpoint is configured
    pub fn reverse_enabled(&self) -> bool {
        self.reverse_path.is_some()
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key),
            None => request,
        }
    }

    /// Forward lookup: name -> address via `GET {base}/resolve/address/{domain}`
    pub async fn resolve_domain(&self, domain: &str) -> ResolverResult<Option<String>> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Ok(None);
        }

        let url = format!(
            "{}/resolve/address/{}",
            self.base_url,
            urlencoding::encode(&domain)
        );

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            debug!("Forward lookup for {} returned {}", domain, response.status());
            return Ok(None);
        }

        let body: ForwardResponse = response.json().await?;
        Ok(body
            .address
            .and_then(|a| WalletAddress::normalize(&a))
            .map(|a| a.as_str().to_string()))
    }
}

#[async_trait]
impl NameStrategy for RestNameStrategy {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn lookup(&self, address: &WalletAddress) -> ResolverResult<Option<String>> {
        // The backend has no reverse endpoint yet; until one is configured
        // this step always yields "not found" and the on-chain read decides.
        let Some(template) = &self.reverse_path else {
            debug!("Reverse REST lookup not configured, skipping {}", address);
            return Ok(None);
        };

        let url = format!(
            "{}{}",
            self.base_url,
            template.replace("{address}", &urlencoding::encode(address.as_str()))
        );

        let response = self.get(&url).send().await?;
        if !response.status().is_success() {
            debug!("Reverse lookup for {} returned {}", address, response.status());
            return Ok(None);
        }

        let body: ReverseResponse = response.json().await?;
        Ok(body
            .name
            .or(body.primary_name)
            .filter(|n| !n.trim().is_empty()))
    }
}
