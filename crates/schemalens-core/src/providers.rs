//! Bundled HTTP collaborators
//!
//! Requires the `http-providers` feature.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::analysis::{DEFAULT_FETCH_TIMEOUT, RankedSearchProvider, StructuredDataValidator};
use crate::error::{AnalysisError, Result};
use crate::jsonld;

pub const SCHEMA_ORG_VALIDATOR_ENDPOINT: &str = "https://validator.schema.org/validate";
pub const VALUESERP_ENDPOINT: &str = "https://api.valueserp.com/search";

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!(
            "Mozilla/5.0 (compatible; schemalens/{})",
            env!("CARGO_PKG_VERSION")
        ))
        .timeout(timeout)
        .build()
        .map_err(|err| AnalysisError::fetch("(client)", err))
}

async fn read_body(url: &str, response: reqwest::Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(AnalysisError::fetch(url, format!("HTTP {status}")));
    }
    response
        .text()
        .await
        .map_err(|err| AnalysisError::fetch(url, err))
}

/// Client for the public schema.org validator
#[derive(Debug, Clone)]
pub struct SchemaOrgValidator {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SchemaOrgValidator {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(SCHEMA_ORG_VALIDATOR_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_FETCH_TIMEOUT)?,
            endpoint: endpoint.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StructuredDataValidator for SchemaOrgValidator {
    async fn fetch_raw(&self, url: &str) -> Result<String> {
        debug!(url, endpoint = %self.endpoint, "requesting validator report");
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("url", url)])
            .send()
            .await
            .map_err(|err| AnalysisError::fetch(url, err))?;

        // The body keeps its anti-hijacking prefix; the decoder strips it.
        read_body(url, response).await
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }
}

/// Fetches pages directly and converts their JSON-LD locally
#[derive(Debug, Clone)]
pub struct JsonLdPageValidator {
    client: reqwest::Client,
}

impl JsonLdPageValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_FETCH_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl StructuredDataValidator for JsonLdPageValidator {
    async fn fetch_raw(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| AnalysisError::fetch(url, err))?;
        let html = read_body(url, response).await?;
        jsonld::document_from_html(&html)
    }
}

/// Ranked search through the ValueSerp API
#[derive(Clone)]
pub struct ValueSerpProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for ValueSerpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueSerpProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct SerpResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Deserialize)]
struct OrganicResult {
    #[serde(default)]
    link: Option<String>,
}

impl ValueSerpProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, VALUESERP_ENDPOINT)
    }

    pub fn with_endpoint(api_key: impl Into<String>, endpoint: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_FETCH_TIMEOUT)?,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl RankedSearchProvider for ValueSerpProvider {
    async fn top_results(&self, keyword: &str, count: usize) -> Result<Vec<String>> {
        let num = count.to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("q", keyword),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|err| AnalysisError::fetch(&self.endpoint, err))?;

        let body = read_body(&self.endpoint, response).await?;
        let parsed: SerpResponse = serde_json::from_str(&body).map_err(|err| {
            AnalysisError::MalformedResponse(format!("search response: {err}"))
        })?;

        let links: Vec<String> = parsed
            .organic_results
            .into_iter()
            .filter_map(|result| result.link)
            .take(count)
            .collect();
        debug!(keyword, results = links.len(), "ranked search complete");
        Ok(links)
    }
}
